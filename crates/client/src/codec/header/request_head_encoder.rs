//! HTTP request head encoder
//!
//! Serializes the request line and headers of a [`RequestHead`] into raw bytes and
//! keeps the `Content-Length` / `Transfer-Encoding` headers consistent with the
//! [`PayloadSize`] the body will be framed with.

use crate::protocol::{PayloadSize, ProtocolError, RequestHead, need_body};

use bytes::{BufMut, BytesMut};

use http::{HeaderValue, Method, Version, header};
use std::io;
use std::io::Write;
use tokio_util::codec::Encoder;
use tracing::error;

/// Initial buffer size allocated for head serialization
const INIT_HEADER_SIZE: usize = 4 * 1024;

/// Encoder for HTTP request heads implementing the [`Encoder`] trait.
#[derive(Debug, Default)]
pub struct RequestHeadEncoder;

impl Encoder<(RequestHead, PayloadSize)> for RequestHeadEncoder {
    type Error = ProtocolError;

    /// Encodes the request head into the provided bytes buffer.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - HTTP version is neither HTTP/1.0 nor HTTP/1.1
    /// - the payload is [`PayloadSize::Unbounded`], which a request can't use
    /// - chunked encoding is requested for HTTP/1.0
    fn encode(&mut self, item: (RequestHead, PayloadSize), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (mut head, payload_size) = item;

        let version = match head.version() {
            Version::HTTP_11 => "HTTP/1.1",
            Version::HTTP_10 => "HTTP/1.0",
            v => {
                error!(http_version = ?v, "unsupported http version");
                return Err(ProtocolError::UnsupportedVersion(v));
            }
        };

        if !head.headers().contains_key(header::HOST)
            && let Some(authority) = head.uri().authority()
        {
            let host = HeaderValue::from_str(authority.as_str()).map_err(ProtocolError::invalid_header)?;
            head.headers_mut().insert(header::HOST, host);
        }

        // Set appropriate content length or transfer encoding header
        let body_expected = need_body(head.method());
        let http_10 = head.version() == Version::HTTP_10;
        let headers = head.headers_mut();
        match payload_size {
            PayloadSize::Length(n) => {
                headers.remove(header::TRANSFER_ENCODING);
                headers.insert(header::CONTENT_LENGTH, n.into());
            }
            PayloadSize::Chunked if http_10 => {
                return Err(ProtocolError::invalid_body("chunked transfer encoding is not supported by HTTP/1.0"));
            }
            PayloadSize::Chunked => {
                headers.remove(header::CONTENT_LENGTH);
                headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
            }
            PayloadSize::Empty => {
                headers.remove(header::TRANSFER_ENCODING);
                if body_expected {
                    const ZERO_VALUE: HeaderValue = HeaderValue::from_static("0");
                    headers.insert(header::CONTENT_LENGTH, ZERO_VALUE);
                } else {
                    headers.remove(header::CONTENT_LENGTH);
                }
            }
            PayloadSize::Unbounded => {
                return Err(ProtocolError::invalid_body("request body can't be delimited by connection close"));
            }
        }

        dst.reserve(INIT_HEADER_SIZE);
        let target = if *head.method() == Method::CONNECT {
            head.uri().authority().map_or("/", |authority| authority.as_str())
        } else {
            head.uri().path_and_query().map_or("/", |path| path.as_str())
        };
        write!(FastWrite(dst), "{} {} {}\r\n", head.method(), target, version)?;

        // Write all headers
        for (header_name, header_value) in head.headers().iter() {
            dst.put_slice(header_name.as_ref());
            dst.put_slice(b": ");
            dst.put_slice(header_value.as_ref());
            dst.put_slice(b"\r\n");
        }
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

/// Writer appending to a `BytesMut` whose capacity was already reserved.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
