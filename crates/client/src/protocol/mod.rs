//! Core HTTP protocol abstractions shared by the exchange engine.
//!
//! # Components
//!
//! - **Message heads** ([`RequestHead`], [`ResponseHead`]): `http` messages without a body,
//!   the body is streamed separately through content codecs
//! - **Payload framing** ([`PayloadSize`]): how a body is delimited on the wire
//! - **Error Handling**:
//!   - [`ExchangeError`]: Top-level error and failure cause of an exchange
//!   - [`ProtocolError`]: Protocol violations raised by processors and codecs

mod message;
pub use message::PayloadSize;
pub(crate) use message::is_chunked;

mod request;
pub use request::RequestHead;
pub use request::need_body;

mod response;
pub use response::ResponseHead;
pub use response::can_have_body;

mod error;
pub use error::ExchangeError;
pub use error::ProtocolError;
