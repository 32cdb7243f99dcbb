use std::error::Error;
use std::io;
use thiserror::Error;

/// Top-level error of a request/response exchange.
///
/// This is the cause carried by a failed exchange outcome and the error type returned
/// from every callback of [`ExchangeHandler`](crate::exchange::ExchangeHandler).
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("protocol error: {source}")]
    Protocol {
        #[from]
        source: ProtocolError,
    },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    #[error("connection closed: {reason}")]
    ConnectionClosed { reason: String },

    #[error("request producer error: {reason}")]
    Producer { reason: String },

    #[error("response consumer error: {reason}")]
    Consumer { reason: String },

    #[error("response consumer completed without a result")]
    MissingResult,

    #[error("exchange already terminated")]
    Terminated,

    #[error(transparent)]
    Other { source: Box<dyn Error + Send + Sync> },
}

impl ExchangeError {
    pub fn connection_closed<S: ToString>(str: S) -> Self {
        Self::ConnectionClosed { reason: str.to_string() }
    }

    pub fn producer<S: ToString>(str: S) -> Self {
        Self::Producer { reason: str.to_string() }
    }

    pub fn consumer<S: ToString>(str: S) -> Self {
        Self::Consumer { reason: str.to_string() }
    }

    pub fn other<E: Into<Box<dyn Error + Send + Sync>>>(e: E) -> Self {
        Self::Other { source: e.into() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }

    /// Returns true if the peer closed the connection before the exchange finished
    #[inline]
    pub fn is_connection_closed(&self) -> bool {
        matches!(self, Self::ConnectionClosed { .. })
    }

    /// Returns true if the error was raised by the protocol processor or a codec
    #[inline]
    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::Protocol { .. })
    }
}

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("header size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("header number exceed the limit {max_num}")]
    TooManyHeaders { max_num: usize },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid http version: {0:?}")]
    InvalidVersion(Option<u8>),

    #[error("unsupported http version: {0:?}")]
    UnsupportedVersion(http::Version),

    #[error("invalid http status code: {0}")]
    InvalidStatus(u16),

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("body size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeBody { current_size: usize, max_size: usize },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ProtocolError {
    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn too_many_headers(max_num: usize) -> Self {
        Self::TooManyHeaders { max_num }
    }

    pub fn too_large_body(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeBody { current_size, max_size }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}
