//! HTTP response head decoder
//!
//! Parses the status line and header fields of a response from raw bytes into a
//! [`ResponseHead`] and resolves how the response body is framed.
//!
//! # Limits
//!
//! - Maximum number of headers: 64
//! - Maximum header size: 8KB
//! - Only supports HTTP/1.0 and HTTP/1.1
//!
//! # Implementation Details
//!
//! 1. Parse raw bytes using `httparse`
//! 2. Record header name/value byte ranges
//! 3. Split the head off the input and build the `http::Response` from shared slices
//! 4. Determine the payload size from the request method, status and headers

use bytes::BytesMut;
use http::{HeaderName, HeaderValue, Method, Response, StatusCode, header};
use httparse::{Error, Status};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;
use crate::protocol::{PayloadSize, ProtocolError, ResponseHead, can_have_body, is_chunked};

/// Maximum number of headers allowed in a response
const MAX_HEADER_NUM: usize = 64;

/// Maximum size in bytes allowed for the entire header section
const MAX_HEADER_BYTES: usize = 8 * 1024;

/// Decoder for HTTP response heads implementing the [`Decoder`] trait.
///
/// The decoder needs the method of the request being answered: responses to `HEAD`
/// and successful `CONNECT` never carry a body, whatever their headers say.
/// Interim `1xx` responses are returned like any other head with an empty payload.
#[derive(Debug, Clone)]
pub struct ResponseHeadDecoder {
    method: Method,
}

impl ResponseHeadDecoder {
    pub fn new(method: Method) -> Self {
        Self { method }
    }
}

impl Decoder for ResponseHeadDecoder {
    type Item = (ResponseHead, PayloadSize);
    type Error = ProtocolError;

    /// Attempts to decode a response head from the provided bytes buffer.
    ///
    /// # Returns
    ///
    /// - `Ok(Some((head, payload_size)))` if a complete head was parsed, the body bytes stay in `src`
    /// - `Ok(None)` if more data is needed
    /// - `Err(ProtocolError)` if parsing failed
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
        let mut resp = httparse::Response::new(&mut headers);

        let parsed_result = resp.parse(src).map_err(|e| match e {
            Error::TooManyHeaders => ProtocolError::too_many_headers(MAX_HEADER_NUM),
            e => ProtocolError::invalid_header(e.to_string()),
        });

        match parsed_result? {
            Status::Complete(body_offset) => {
                trace!(head_size = body_offset, "parsed response head");
                ensure!(body_offset <= MAX_HEADER_BYTES, ProtocolError::too_large_header(body_offset, MAX_HEADER_BYTES));

                let version = match resp.version {
                    Some(0) => http::Version::HTTP_10,
                    Some(1) => http::Version::HTTP_11,
                    _ => return Err(ProtocolError::InvalidVersion(resp.version)),
                };

                let code = resp.code.ok_or_else(|| ProtocolError::invalid_header("missing status code"))?;
                let status = StatusCode::from_u16(code).map_err(|_| ProtocolError::InvalidStatus(code))?;

                let header_count = resp.headers.len();
                let mut header_index = [EMPTY_HEADER_INDEX; MAX_HEADER_NUM];
                HeaderIndex::record(src, resp.headers, &mut header_index);

                let header_bytes = src.split_to(body_offset).freeze();

                let mut head = Response::new(());
                *head.status_mut() = status;
                *head.version_mut() = version;

                let headers = head.headers_mut();
                headers.reserve(header_count);
                for index in &header_index[..header_count] {
                    let name =
                        HeaderName::from_bytes(&header_bytes[index.name.0..index.name.1]).map_err(ProtocolError::invalid_header)?;
                    let value = HeaderValue::from_maybe_shared(header_bytes.slice(index.value.0..index.value.1))
                        .map_err(ProtocolError::invalid_header)?;
                    headers.append(name, value);
                }

                let payload_size = response_payload_size(&self.method, &head)?;
                Ok(Some((head, payload_size)))
            }
            Status::Partial => {
                ensure!(src.len() <= MAX_HEADER_BYTES, ProtocolError::too_large_header(src.len(), MAX_HEADER_BYTES));
                Ok(None)
            }
        }
    }
}

/// Stores the byte range positions of a header's name and value within the original buffer.
#[derive(Clone, Copy)]
struct HeaderIndex {
    name: (usize, usize),
    value: (usize, usize),
}

const EMPTY_HEADER_INDEX: HeaderIndex = HeaderIndex { name: (0, 0), value: (0, 0) };

impl HeaderIndex {
    fn record(bytes: &[u8], headers: &[httparse::Header<'_>], indices: &mut [HeaderIndex]) {
        let bytes_ptr = bytes.as_ptr() as usize;
        for (header, indices) in headers.iter().zip(indices.iter_mut()) {
            let name_start = header.name.as_ptr() as usize - bytes_ptr;
            let name_end = name_start + header.name.len();
            indices.name = (name_start, name_end);
            let value_start = header.value.as_ptr() as usize - bytes_ptr;
            let value_end = value_start + header.value.len();
            indices.value = (value_start, value_end);
        }
    }
}

/// Determines how the response body is delimited.
///
/// refer: <https://www.rfc-editor.org/rfc/rfc9112.html#name-message-body-length>
fn response_payload_size(method: &Method, head: &ResponseHead) -> Result<PayloadSize, ProtocolError> {
    if !can_have_body(method, head.status()) {
        return Ok(PayloadSize::new_empty());
    }

    let headers = head.headers();
    let te_header = headers.get(header::TRANSFER_ENCODING);
    let has_length = headers.contains_key(header::CONTENT_LENGTH);

    match te_header {
        None if !has_length => Ok(PayloadSize::Unbounded),
        Some(_) if !has_length && !is_chunked(te_header) => Ok(PayloadSize::Unbounded),
        _ => PayloadSize::from_headers(headers),
    }
}
