//! An asynchronous HTTP/1.1 client exchange engine
//!
//! This crate drives single HTTP request/response exchanges on behalf of a
//! non-blocking I/O reactor. The reactor owns the socket and calls back into an
//! [`exchange::ExchangeHandler`] as the connection becomes writable or readable; the
//! handler enforces the event order, runs the protocol processor and resolves an
//! [`exchange::ExchangeFuture`] exactly once with a result, a failure or a
//! cancellation.
//!
//! # Features
//!
//! - Pluggable request producers and response consumers
//! - Single-resolution outcome future, usable from blocking and async code
//! - Interceptor chain applied to every request and response
//! - Shared exchange context with typed attributes
//! - HTTP/1.x connection reuse decisions
//! - Request head encoding and response head decoding
//! - Content-Length and chunked body framing
//!
//! # Example
//!
//! ```
//! use std::error::Error;
//! use std::io;
//! use std::sync::Arc;
//!
//! use http::Request;
//! use micro_client::connection::ClientConnection;
//! use micro_client::context::HttpContext;
//! use micro_client::exchange::{BasicRequestProducer, BasicResponseConsumer, ExchangeHandler};
//! use micro_client::processor::ProcessorChain;
//!
//! struct Connection;
//!
//! impl ClientConnection for Connection {
//!     fn is_open(&self) -> bool { true }
//!     fn request_input(&self) {}
//!     fn suspend_input(&self) {}
//!     fn request_output(&self) {}
//!     fn suspend_output(&self) {}
//!     fn close(&self) -> io::Result<()> { Ok(()) }
//!     fn shutdown(&self) -> io::Result<()> { Ok(()) }
//! }
//!
//! fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
//!     let request = Request::get("http://example.com/").body(())?;
//!
//!     let mut handler = ExchangeHandler::builder()
//!         .producer(BasicRequestProducer::from_head(request))
//!         .consumer(BasicResponseConsumer::new())
//!         .context(HttpContext::new())
//!         .connection(Arc::new(Connection))
//!         .processor(Arc::new(ProcessorChain::standard()))
//!         .build()?;
//!     let future = handler.future();
//!
//!     let request = handler.generate_request()?;
//!     assert!(request.headers().contains_key(http::header::USER_AGENT));
//!
//!     // the reactor gave up on the exchange
//!     handler.cancel();
//!     assert!(future.is_cancelled());
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! The crate is organized into several key modules:
//!
//! - [`exchange`]: the exchange handler, its outcome future and the producer/consumer roles
//! - [`context`]: attributes shared between the handler and protocol interceptors
//! - [`processor`]: cross-cutting request and response processing
//! - [`connection`]: the reactor-side connection abstraction
//! - [`codec`]: content codec ports and HTTP/1.1 head and body codecs
//! - [`protocol`]: message types and error types
//!
//! # Error Handling
//!
//! - [`protocol::ExchangeError`]: cause of a failed exchange, returned from every callback
//! - [`protocol::ProtocolError`]: malformed or non-conforming messages
//! - [`exchange::ExchangeBuildError`]: a required collaborator is missing
//! - [`exchange::OutcomeError`]: why retrieving the outcome produced no value
//!
//! # Limitations
//!
//! - HTTP/1.0 and HTTP/1.1 only
//! - No connection pooling, routing or retries
//! - Maximum response header size: 8KB
//! - Maximum number of response headers: 64

pub mod codec;
pub mod connection;
pub mod context;
pub mod exchange;
pub mod processor;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
