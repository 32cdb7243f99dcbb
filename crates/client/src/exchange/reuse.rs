use http::{HeaderMap, HeaderValue, Version, header};

use crate::context::HttpContext;
use crate::protocol::{ResponseHead, can_have_body, is_chunked};

/// Decides whether a connection can carry another exchange once the current response completed.
#[cfg_attr(test, mockall::automock)]
pub trait ConnectionReuseStrategy: Send + Sync {
    fn keep_alive(&self, response: &ResponseHead, context: &HttpContext) -> bool;
}

/// HTTP/1.x persistence rules.
///
/// The connection is reused unless one of the following holds:
///
/// - the connection published in the context is no longer open
/// - the response body is delimited by closing the connection
/// - the request or the response carries `Connection: close`
/// - the response is HTTP/1.0 without `Connection: keep-alive`
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConnectionReuseStrategy;

impl ConnectionReuseStrategy for DefaultConnectionReuseStrategy {
    fn keep_alive(&self, response: &ResponseHead, context: &HttpContext) -> bool {
        if let Some(connection) = context.connection()
            && !connection.is_open()
        {
            return false;
        }

        let request = context.request();
        if let Some(request) = &request
            && has_connection_option(request.headers(), "close")
        {
            return false;
        }

        let headers = response.headers();
        let body_expected = request.as_ref().is_none_or(|request| can_have_body(request.method(), response.status()));
        if body_expected && !headers.contains_key(header::CONTENT_LENGTH) && !is_chunked(headers.get(header::TRANSFER_ENCODING))
        {
            return false;
        }

        if has_connection_option(headers, "close") {
            return false;
        }

        match response.version() {
            Version::HTTP_10 => has_connection_option(headers, "keep-alive"),
            _ => true,
        }
    }
}

fn has_connection_option(headers: &HeaderMap, option: &str) -> bool {
    headers.get_all(header::CONNECTION).iter().any(|value| connection_has(value, option))
}

fn connection_has(value: &HeaderValue, option: &str) -> bool {
    if let Ok(str) = value.to_str() {
        return str.split(',').any(|token| token.trim().eq_ignore_ascii_case(option));
    }
    false
}
