//! HTTP request head handling.
//!
//! A request head is the standard `http::Request` with an empty body placeholder.
//! The body itself is streamed separately by a
//! [`RequestProducer`](crate::exchange::RequestProducer) through a content encoder.

use http::{Method, Request};

/// Type alias for HTTP request heads.
pub type RequestHead = Request<()>;

/// Determines if a request with this method is expected to carry a body.
///
/// Returns false for methods that typically don't have bodies:
/// - GET
/// - HEAD
/// - DELETE
/// - OPTIONS
/// - CONNECT
/// - TRACE
#[inline]
pub fn need_body(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD | Method::DELETE | Method::OPTIONS | Method::CONNECT | Method::TRACE)
}
