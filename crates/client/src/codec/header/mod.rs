//! HTTP head processing module for encoding requests and decoding responses
//!
//! # Components
//!
//! - [`RequestHeadEncoder`]: Encodes the request line and headers to bytes
//!   - Implements standard HTTP/1.0 and HTTP/1.1 formatting
//!   - Manages content-length and transfer-encoding headers
//!   - Fills in the `Host` header from the request target
//!
//! - [`ResponseHeadDecoder`]: Decodes the status line and headers from raw bytes
//!   - Handles header field validation
//!   - Manages header size limits
//!   - Resolves the body framing of the response

mod request_head_encoder;
mod response_head_decoder;

pub use request_head_encoder::RequestHeadEncoder;
pub use response_head_decoder::ResponseHeadDecoder;
