//! HTTP client connection abstraction
//!
//! The exchange engine never touches sockets itself. The I/O reactor owning the
//! socket exposes it through [`ClientConnection`], which the
//! [`ExchangeHandler`](crate::exchange::ExchangeHandler) publishes into the
//! [`HttpContext`](crate::context::HttpContext) and hands to producers and consumers
//! so they can throttle readiness events.
//!
//! A connection is shared by the reactor and every exchange running on it, it is
//! never closed by an exchange.

use std::io;

/// Non-blocking client connection driven by an I/O reactor.
///
/// Readiness interest is cooperative: a producer with no data at hand calls
/// [`suspend_output`](ClientConnection::suspend_output) and resumes with
/// [`request_output`](ClientConnection::request_output) once it has more, a
/// consumer applying back pressure does the same with input.
#[cfg_attr(test, mockall::automock)]
pub trait ClientConnection: Send + Sync {
    /// Returns true while the connection can carry exchanges
    fn is_open(&self) -> bool;

    /// Asks the reactor to deliver input readiness events
    fn request_input(&self);

    /// Stops input readiness events until [`request_input`](ClientConnection::request_input)
    fn suspend_input(&self);

    /// Asks the reactor to deliver output readiness events
    fn request_output(&self);

    /// Stops output readiness events until [`request_output`](ClientConnection::request_output)
    fn suspend_output(&self);

    /// Gracefully closes the connection, flushing pending output
    fn close(&self) -> io::Result<()>;

    /// Closes the connection immediately, discarding pending output
    fn shutdown(&self) -> io::Result<()>;
}
