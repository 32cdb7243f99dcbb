//! HTTP response head handling implementation.
//!
//! It uses the standard `http::Response` type with an empty body placeholder
//! to represent a response head before its body has been consumed.

use http::{Method, Response, StatusCode};

/// Type alias for HTTP response heads.
///
/// This type represents the head portion of an HTTP response, using
/// `http::Response<()>` with an empty body placeholder. The body is pulled
/// later by a [`ResponseConsumer`](crate::exchange::ResponseConsumer).
pub type ResponseHead = Response<()>;

/// Returns true if a response with `status` to a request with `method` can carry a body.
///
/// Refer: <https://www.rfc-editor.org/rfc/rfc9112.html#section-6.3>
#[inline]
pub fn can_have_body(method: &Method, status: StatusCode) -> bool {
    if *method == Method::HEAD {
        return false;
    }
    if *method == Method::CONNECT && status.is_success() {
        return false;
    }
    !(status.is_informational() || status == StatusCode::NO_CONTENT || status == StatusCode::NOT_MODIFIED)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bodiless_responses() {
        assert!(can_have_body(&Method::GET, StatusCode::OK));
        assert!(!can_have_body(&Method::HEAD, StatusCode::OK));
        assert!(!can_have_body(&Method::GET, StatusCode::NO_CONTENT));
        assert!(!can_have_body(&Method::GET, StatusCode::NOT_MODIFIED));
        assert!(!can_have_body(&Method::CONNECT, StatusCode::OK));
        assert!(can_have_body(&Method::CONNECT, StatusCode::BAD_GATEWAY));
    }
}
