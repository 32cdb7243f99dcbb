use http::{HeaderValue, header};

use crate::protocol::ProtocolError;

/// Represents the size information of an HTTP payload.
///
/// This enum is used to determine how a body is framed on the wire:
/// - Known length: exact number of bytes
/// - Chunked: chunked transfer encoding
/// - Empty: no payload at all
/// - Unbounded: response body delimited by the peer closing the connection
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PayloadSize {
    /// Payload with known length in bytes
    Length(u64),
    /// Payload using chunked transfer encoding
    Chunked,
    /// Empty payload (no body)
    Empty,
    /// Response payload read until the connection is closed
    Unbounded,
}

impl PayloadSize {
    #[inline]
    pub fn new_length(length: u64) -> Self {
        if length == 0 { PayloadSize::Empty } else { PayloadSize::Length(length) }
    }

    #[inline]
    pub fn new_chunked() -> Self {
        PayloadSize::Chunked
    }

    #[inline]
    pub fn new_empty() -> Self {
        PayloadSize::Empty
    }

    /// Returns true if the payload uses chunked transfer encoding
    #[inline]
    pub fn is_chunked(&self) -> bool {
        matches!(self, PayloadSize::Chunked)
    }

    /// Returns true if the payload is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, PayloadSize::Empty)
    }

    /// Returns true if the payload ends only when the connection is closed
    #[inline]
    pub fn is_unbounded(&self) -> bool {
        matches!(self, PayloadSize::Unbounded)
    }

    /// Resolves the payload framing from `Transfer-Encoding` and `Content-Length` headers.
    ///
    /// Follows [RFC 9112 section 6.3](https://www.rfc-editor.org/rfc/rfc9112.html#name-message-body-length):
    /// a message carrying both headers is rejected, and so is a transfer coding whose final
    /// coding is not chunked. Close-delimited response bodies are resolved by the response
    /// head decoder before calling this.
    pub fn from_headers(headers: &http::HeaderMap) -> Result<Self, ProtocolError> {
        let te_header = headers.get(header::TRANSFER_ENCODING);
        let cl_header = headers.get(header::CONTENT_LENGTH);

        match (te_header, cl_header) {
            (None, None) => Ok(PayloadSize::new_empty()),

            (te_value @ Some(_), None) => {
                if is_chunked(te_value) {
                    Ok(PayloadSize::new_chunked())
                } else {
                    Err(ProtocolError::invalid_header("transfer-encoding is present but chunked is not the final coding"))
                }
            }

            (None, Some(cl_value)) => {
                let cl_str = cl_value.to_str().map_err(|_| ProtocolError::invalid_content_length("value can't to_str"))?;

                let length = cl_str
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| ProtocolError::invalid_content_length(format!("value {cl_str} is not u64")))?;

                Ok(PayloadSize::new_length(length))
            }

            (Some(_), Some(_)) => {
                Err(ProtocolError::invalid_content_length("transfer_encoding and content_length both present in headers"))
            }
        }
    }
}

/// Checks if the Transfer-Encoding header indicates chunked encoding.
///
/// According to RFC 7230, chunked must be the last encoding if present.
pub(crate) fn is_chunked(header_value: Option<&HeaderValue>) -> bool {
    const CHUNKED: &[u8] = b"chunked";
    if let Some(value) = header_value
        && let Some(bytes) = value.as_bytes().rsplit(|b| *b == b',').next()
    {
        return bytes.trim_ascii().eq_ignore_ascii_case(CHUNKED);
    }
    false
}
