//! Content codec ports and their HTTP/1.1 implementations
//!
//! The exchange engine moves body bytes through two non-blocking ports:
//!
//! - [`ContentEncoder`]: a [`RequestProducer`](crate::exchange::RequestProducer) pushes request
//!   body bytes into it whenever the connection is writable
//! - [`ContentDecoder`]: a [`ResponseConsumer`](crate::exchange::ResponseConsumer) pulls response
//!   body bytes out of it whenever the connection is readable
//!
//! Both expose a completion flag. The exchange handler never inspects them beyond
//! passing them through.
//!
//! # Implementations
//!
//! - Body framing via the [`body`] components:
//!   - [`LengthEncoder`] / [`LengthDecoder`]: `Content-Length` delimited bodies
//!   - [`ChunkedEncoder`] / [`ChunkedDecoder`]: chunked transfer encoding
//!   - [`IdentityDecoder`]: bodies delimited by connection close
//! - Head framing via the [`header`] components:
//!   - [`RequestHeadEncoder`]: serializes the request line and headers
//!   - [`ResponseHeadDecoder`]: parses the status line and headers

mod body;
mod header;

use bytes::BytesMut;
use std::io;

pub use body::ChunkedDecoder;
pub use body::ChunkedEncoder;
pub use body::IdentityDecoder;
pub use body::LengthDecoder;
pub use body::LengthEncoder;
pub use header::RequestHeadEncoder;
pub use header::ResponseHeadDecoder;

/// Non-blocking sink for request body bytes.
#[cfg_attr(test, mockall::automock)]
pub trait ContentEncoder {
    /// Writes a portion of `src`, returning how many bytes were accepted
    fn write(&mut self, src: &[u8]) -> io::Result<usize>;

    /// Terminates the body, no more writes are accepted afterwards
    fn complete(&mut self) -> io::Result<()>;

    fn is_completed(&self) -> bool;
}

/// Non-blocking source of response body bytes.
#[cfg_attr(test, mockall::automock)]
pub trait ContentDecoder {
    /// Moves available body bytes into `dst`, returning how many were read.
    ///
    /// `Ok(0)` means no data is available right now, or the body is complete.
    fn read(&mut self, dst: &mut BytesMut) -> io::Result<usize>;

    fn is_completed(&self) -> bool;
}
