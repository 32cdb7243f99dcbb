use http::{HeaderValue, Version, header};
use tracing::trace;

use crate::context::HttpContext;
use crate::processor::{RequestInterceptor, ResponseInterceptor};
use crate::protocol::{PayloadSize, ProtocolError, RequestHead, ResponseHead, is_chunked};

const DEFAULT_USER_AGENT: &str = concat!("micro-client/", env!("CARGO_PKG_VERSION"));

/// Validates the body framing headers of an outgoing request.
///
/// Rejects a request declaring both `Transfer-Encoding` and `Content-Length`,
/// an unparsable `Content-Length`, and chunked transfer coding on HTTP/1.0.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestContent;

impl RequestInterceptor for RequestContent {
    fn process(&self, request: &mut RequestHead, _context: &HttpContext) -> Result<(), ProtocolError> {
        let payload_size = PayloadSize::from_headers(request.headers())?;

        if payload_size.is_chunked() && request.version() == Version::HTTP_10 {
            return Err(ProtocolError::invalid_header("chunked transfer encoding not allowed for HTTP/1.0"));
        }
        Ok(())
    }
}

/// Adds a `User-Agent` header to requests which don't carry one.
#[derive(Debug, Clone)]
pub struct RequestUserAgent {
    user_agent: HeaderValue,
}

impl RequestUserAgent {
    pub fn new(user_agent: HeaderValue) -> Self {
        Self { user_agent }
    }
}

impl Default for RequestUserAgent {
    fn default() -> Self {
        Self::new(HeaderValue::from_static(DEFAULT_USER_AGENT))
    }
}

impl RequestInterceptor for RequestUserAgent {
    fn process(&self, request: &mut RequestHead, _context: &HttpContext) -> Result<(), ProtocolError> {
        if !request.headers().contains_key(header::USER_AGENT) {
            trace!(user_agent = ?self.user_agent, "add default user agent");
            request.headers_mut().insert(header::USER_AGENT, self.user_agent.clone());
        }
        Ok(())
    }
}

/// Rejects responses whose body framing is ambiguous.
///
/// A response with both `Transfer-Encoding: chunked` and `Content-Length` is a
/// classic request smuggling vector, the exchange is failed instead of guessing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseConformance;

impl ResponseInterceptor for ResponseConformance {
    fn process(&self, response: &mut ResponseHead, _context: &HttpContext) -> Result<(), ProtocolError> {
        let headers = response.headers();
        if is_chunked(headers.get(header::TRANSFER_ENCODING)) && headers.contains_key(header::CONTENT_LENGTH) {
            return Err(ProtocolError::invalid_content_length("transfer_encoding and content_length both present in headers"));
        }
        if headers.get_all(header::CONTENT_LENGTH).iter().count() > 1 {
            return Err(ProtocolError::invalid_content_length("multiple content-length headers"));
        }
        Ok(())
    }
}
