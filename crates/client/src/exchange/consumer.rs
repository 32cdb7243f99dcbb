use std::cmp;
use std::io;

use bytes::{Bytes, BytesMut};
use http::{Response, header};
use tracing::{debug, trace};

use crate::codec::ContentDecoder;
use crate::connection::ClientConnection;
use crate::context::HttpContext;
use crate::protocol::{ExchangeError, ProtocolError, ResponseHead, can_have_body};

/// Upper bound of the buffer reserved up front from a declared `Content-Length`
const MAX_PREALLOCATION: usize = 64 * 1024;

/// Consumes the response of an exchange and turns it into a result of type `T`.
///
/// `response_received` is called once with the processed response head,
/// `consume_content` whenever body bytes are available and `response_completed`
/// once the body ended. The consumer decides whether it produced a result or
/// recorded an exception; the exchange handler collects either through
/// [`take_result`](ResponseConsumer::take_result) and
/// [`take_exception`](ResponseConsumer::take_exception) and then closes it.
pub trait ResponseConsumer<T>: Send {
    fn response_received(&mut self, response: ResponseHead) -> Result<(), ExchangeError>;

    /// Reads available body bytes out of `decoder`
    fn consume_content(
        &mut self,
        decoder: &mut dyn ContentDecoder,
        connection: &dyn ClientConnection,
    ) -> Result<(), ExchangeError>;

    fn response_completed(&mut self, context: &HttpContext) -> Result<(), ExchangeError>;

    fn failed(&mut self, cause: &ExchangeError) -> Result<(), ExchangeError>;

    /// Stops consuming, returns false if there was nothing left to cancel
    fn cancel(&mut self) -> bool;

    fn take_result(&mut self) -> Option<T>;

    /// Returns the exception recorded while consuming, if any
    fn take_exception(&mut self) -> Option<ExchangeError>;

    fn is_done(&self) -> bool;

    /// Releases the resources held by the consumer
    fn close(&mut self) -> io::Result<()>;
}

/// Buffers the whole response body in memory and produces a `Response<Bytes>`.
///
/// A declared `Content-Length` that does not match the received body is recorded
/// as an exception, so is a body exceeding the configured maximum size.
#[derive(Debug, Default)]
pub struct BasicResponseConsumer {
    head: Option<ResponseHead>,
    body: BytesMut,
    max_body_size: Option<usize>,
    result: Option<Response<Bytes>>,
    exception: Option<ExchangeError>,
    done: bool,
}

impl BasicResponseConsumer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits the number of body bytes the consumer buffers
    pub fn with_max_body_size(mut self, max_body_size: usize) -> Self {
        self.max_body_size = Some(max_body_size);
        self
    }

    fn check_body_size(&self, size: u64) -> Result<(), ProtocolError> {
        match self.max_body_size {
            Some(max_size) if size > max_size as u64 => {
                Err(ProtocolError::too_large_body(usize::try_from(size).unwrap_or(usize::MAX), max_size))
            }
            _ => Ok(()),
        }
    }

    fn release(&mut self) {
        self.head = None;
        self.body = BytesMut::new();
    }
}

fn content_length(response: &ResponseHead) -> Result<Option<u64>, ProtocolError> {
    let Some(value) = response.headers().get(header::CONTENT_LENGTH) else {
        return Ok(None);
    };

    let length = value
        .to_str()
        .ok()
        .and_then(|str| str.trim().parse::<u64>().ok())
        .ok_or_else(|| ProtocolError::invalid_content_length(format!("value {value:?} is not u64")))?;
    Ok(Some(length))
}

impl ResponseConsumer<Response<Bytes>> for BasicResponseConsumer {
    fn response_received(&mut self, response: ResponseHead) -> Result<(), ExchangeError> {
        if let Some(length) = content_length(&response)? {
            self.check_body_size(length)?;
            self.body.reserve(cmp::min(length, MAX_PREALLOCATION as u64) as usize);
        }

        trace!(status = %response.status(), "response head received");
        self.head = Some(response);
        Ok(())
    }

    fn consume_content(
        &mut self,
        decoder: &mut dyn ContentDecoder,
        _connection: &dyn ClientConnection,
    ) -> Result<(), ExchangeError> {
        while decoder.read(&mut self.body)? > 0 {
            self.check_body_size(self.body.len() as u64)?;
        }
        Ok(())
    }

    fn response_completed(&mut self, context: &HttpContext) -> Result<(), ExchangeError> {
        let head = self.head.take().ok_or_else(|| ExchangeError::consumer("response completed before its head"))?;
        let body = self.body.split().freeze();
        self.done = true;

        let body_expected = match context.request() {
            Some(request) => can_have_body(request.method(), head.status()),
            None => true,
        };

        if body_expected
            && let Some(declared) = content_length(&head)?
            && declared != body.len() as u64
        {
            debug!(declared, received = body.len(), "response body does not match content-length");
            let message = format!("content-length {declared} but received {} bytes", body.len());
            self.exception = Some(ProtocolError::invalid_body(message).into());
            return Ok(());
        }

        let (parts, ()) = head.into_parts();
        self.result = Some(Response::from_parts(parts, body));
        Ok(())
    }

    fn failed(&mut self, cause: &ExchangeError) -> Result<(), ExchangeError> {
        debug!(%cause, "response consumption failed");
        self.done = true;
        self.release();
        Ok(())
    }

    fn cancel(&mut self) -> bool {
        if self.done {
            return false;
        }
        self.done = true;
        self.release();
        true
    }

    fn take_result(&mut self) -> Option<Response<Bytes>> {
        self.result.take()
    }

    fn take_exception(&mut self) -> Option<ExchangeError> {
        self.exception.take()
    }

    fn is_done(&self) -> bool {
        self.done
    }

    fn close(&mut self) -> io::Result<()> {
        self.release();
        Ok(())
    }
}
