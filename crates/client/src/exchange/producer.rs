use std::io;

use bytes::{Buf, Bytes};
use http::{HeaderValue, header};
use tracing::trace;

use crate::codec::ContentEncoder;
use crate::connection::ClientConnection;
use crate::context::HttpContext;
use crate::protocol::{ExchangeError, RequestHead};

/// Generates the request of an exchange and streams its body.
///
/// Callbacks arrive from the reactor thread in order: `generate_request` once,
/// `produce_content` whenever the connection can take more body bytes,
/// `request_completed` once the whole request was written. `failed` is only
/// called while the request is still being sent, `close` exactly once at the end.
#[cfg_attr(test, mockall::automock)]
pub trait RequestProducer: Send {
    fn generate_request(&mut self) -> Result<RequestHead, ExchangeError>;

    /// Writes request body bytes into `encoder`, completing it after the last byte
    fn produce_content(
        &mut self,
        encoder: &mut dyn ContentEncoder,
        connection: &dyn ClientConnection,
    ) -> Result<(), ExchangeError>;

    fn request_completed(&mut self, context: &HttpContext) -> Result<(), ExchangeError>;

    fn failed(&mut self, cause: &ExchangeError) -> Result<(), ExchangeError>;

    /// Releases the resources held by the producer
    fn close(&mut self) -> io::Result<()>;
}

/// Produces a request from a fixed head and an in-memory body.
///
/// A body, even an empty one, is announced with `Content-Length`. The producer is
/// repeatable: [`reset`](BasicRequestProducer::reset) rewinds the body so the same
/// request can be sent again.
#[derive(Debug, Clone)]
pub struct BasicRequestProducer {
    request: RequestHead,
    body: Option<Bytes>,
    remaining: Bytes,
}

impl BasicRequestProducer {
    pub fn new(request: RequestHead, body: Option<Bytes>) -> Self {
        let remaining = body.clone().unwrap_or_default();
        Self { request, body, remaining }
    }

    /// Creates a producer for a request without body
    pub fn from_head(request: RequestHead) -> Self {
        Self::new(request, None)
    }

    /// Rewinds the body to its first byte
    pub fn reset(&mut self) {
        self.remaining = self.body.clone().unwrap_or_default();
    }

    /// Number of body bytes not yet accepted by an encoder
    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }
}

impl RequestProducer for BasicRequestProducer {
    fn generate_request(&mut self) -> Result<RequestHead, ExchangeError> {
        let mut request = self.request.clone();
        if let Some(body) = &self.body {
            request.headers_mut().insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));
        }
        Ok(request)
    }

    fn produce_content(
        &mut self,
        encoder: &mut dyn ContentEncoder,
        _connection: &dyn ClientConnection,
    ) -> Result<(), ExchangeError> {
        while self.remaining.has_remaining() {
            let written = encoder.write(&self.remaining)?;
            if written == 0 {
                // encoder is full, wait for the next output event
                return Ok(());
            }
            self.remaining.advance(written);
            trace!(written, remaining = self.remaining.len(), "produced request content");
        }

        if !encoder.is_completed() {
            encoder.complete()?;
        }
        Ok(())
    }

    fn request_completed(&mut self, _context: &HttpContext) -> Result<(), ExchangeError> {
        trace!(uri = %self.request.uri(), "request completed");
        Ok(())
    }

    fn failed(&mut self, cause: &ExchangeError) -> Result<(), ExchangeError> {
        trace!(uri = %self.request.uri(), cause = %cause, "request failed, rewind body");
        self.reset();
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.reset();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{LengthEncoder, MockContentEncoder};
    use crate::connection::MockClientConnection;
    use http::{Method, Request};

    fn post(uri: &str) -> RequestHead {
        Request::builder().method(Method::POST).uri(uri).body(()).unwrap()
    }

    #[test]
    fn announces_body_length() {
        let mut producer = BasicRequestProducer::new(post("/upload"), Some(Bytes::from_static(b"hello")));

        let request = producer.generate_request().unwrap();

        assert_eq!(request.method(), Method::POST);
        assert_eq!(request.headers().get(header::CONTENT_LENGTH).unwrap(), "5");
    }

    #[test]
    fn no_body_no_length() {
        let mut producer = BasicRequestProducer::from_head(Request::builder().uri("/").body(()).unwrap());

        let request = producer.generate_request().unwrap();

        assert!(request.headers().get(header::CONTENT_LENGTH).is_none());
    }

    #[test]
    fn streams_body_and_completes_encoder() {
        let mut producer = BasicRequestProducer::new(post("/"), Some(Bytes::from_static(b"hello world")));
        let mut encoder = LengthEncoder::new(11);
        let connection = MockClientConnection::new();

        producer.produce_content(&mut encoder, &connection).unwrap();

        assert!(encoder.is_completed());
        assert_eq!(producer.remaining(), 0);
        assert_eq!(&encoder.take_output()[..], b"hello world");
    }

    #[test]
    fn waits_when_encoder_is_full() {
        let mut producer = BasicRequestProducer::new(post("/"), Some(Bytes::from_static(b"abcdef")));
        let connection = MockClientConnection::new();

        let mut encoder = MockContentEncoder::new();
        encoder.expect_write().times(1).returning(|_| Ok(4));
        encoder.expect_write().times(1).returning(|_| Ok(0));
        encoder.expect_complete().never();

        producer.produce_content(&mut encoder, &connection).unwrap();
        assert_eq!(producer.remaining(), 2);

        producer.reset();
        assert_eq!(producer.remaining(), 6);
    }

    #[test]
    fn encoder_error_is_propagated() {
        let mut producer = BasicRequestProducer::new(post("/"), Some(Bytes::from_static(b"abc")));
        let connection = MockClientConnection::new();

        let mut encoder = MockContentEncoder::new();
        encoder.expect_write().returning(|_| Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe")));

        let error = producer.produce_content(&mut encoder, &connection).unwrap_err();
        assert!(matches!(error, ExchangeError::Io { .. }));
    }

    #[test]
    fn failure_rewinds_body() {
        let mut producer = BasicRequestProducer::new(post("/"), Some(Bytes::from_static(b"abcdef")));
        let connection = MockClientConnection::new();

        let mut encoder = MockContentEncoder::new();
        encoder.expect_write().times(1).returning(|_| Ok(4));
        encoder.expect_write().times(1).returning(|_| Ok(0));
        producer.produce_content(&mut encoder, &connection).unwrap();
        assert_eq!(producer.remaining(), 2);

        producer.failed(&ExchangeError::connection_closed("reset by peer")).unwrap();
        assert_eq!(producer.remaining(), 6);
    }
}
