//! Asynchronous request/response exchange
//!
//! An exchange is one request/response cycle over a client connection. The I/O
//! reactor drives it by calling back into an [`ExchangeHandler`] in order:
//!
//! 1. [`generate_request`](ExchangeHandler::generate_request), then
//!    [`produce_content`](ExchangeHandler::produce_content) until the request body is
//!    written, then [`request_completed`](ExchangeHandler::request_completed)
//! 2. [`response_received`](ExchangeHandler::response_received), then
//!    [`consume_content`](ExchangeHandler::consume_content) until the response body
//!    ended, then [`response_completed`](ExchangeHandler::response_completed)
//!
//! [`failed`](ExchangeHandler::failed), [`cancel`](ExchangeHandler::cancel),
//! [`input_terminated`](ExchangeHandler::input_terminated) and
//! [`close`](ExchangeHandler::close) may interrupt either phase.
//!
//! What goes on the wire and what the caller gets back is decided by two pluggable
//! roles, a [`RequestProducer`] and a [`ResponseConsumer`]. The caller observes the
//! outcome through an [`ExchangeFuture`], resolved exactly once.

mod consumer;
mod future;
mod handler;
mod producer;
mod reuse;

pub use consumer::BasicResponseConsumer;
pub use consumer::ResponseConsumer;
pub use future::ExchangeFuture;
pub use future::Outcome;
pub use future::OutcomeError;
pub use handler::ExchangeBuildError;
pub use handler::ExchangeHandler;
pub use handler::ExchangeHandlerBuilder;
pub use handler::ExchangeState;
pub use producer::BasicRequestProducer;
pub use producer::RequestProducer;
pub use reuse::ConnectionReuseStrategy;
pub use reuse::DefaultConnectionReuseStrategy;

#[cfg(test)]
pub(crate) use producer::MockRequestProducer;
#[cfg(test)]
pub(crate) use reuse::MockConnectionReuseStrategy;
