//! Single-assignment outcome of an exchange
//!
//! The handler keeps the resolving half, a [`Promise`], and hands out the observing
//! half, an [`ExchangeFuture`]. The outcome is written at most once: whichever of
//! completion, failure or cancellation comes first wins and later writes are no-ops.
//!
//! The future can be queried without consuming it, blocked on from any thread with
//! [`ExchangeFuture::get`] or awaited like any other [`Future`](std::future::Future).

use std::fmt;
use std::pin::Pin;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::protocol::ExchangeError;

/// The final state of an exchange.
#[derive(Debug)]
pub enum Outcome<T> {
    Completed(T),
    Failed(ExchangeError),
    Cancelled,
}

/// Why retrieving the value of an [`ExchangeFuture`] did not produce one
#[derive(Debug, Error)]
pub enum OutcomeError {
    #[error("exchange failed: {0}")]
    Failed(#[source] ExchangeError),

    #[error("exchange cancelled")]
    Cancelled,

    #[error("exchange not resolved within {0:?}")]
    Timeout(Duration),

    #[error("exchange outcome already retrieved")]
    Retrieved,
}

impl OutcomeError {
    /// Returns the failure cause if the exchange failed
    pub fn into_cause(self) -> Option<ExchangeError> {
        match self {
            OutcomeError::Failed(cause) => Some(cause),
            _ => None,
        }
    }
}

/// Creates a linked promise and future pair in the pending state
pub(crate) fn promise<T>() -> (Promise<T>, ExchangeFuture<T>) {
    let shared = Arc::new(Shared { cell: Mutex::new(Cell::default()), condvar: Condvar::new() });
    (Promise { shared: Arc::clone(&shared) }, ExchangeFuture { shared })
}

struct Shared<T> {
    cell: Mutex<Cell<T>>,
    condvar: Condvar,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, Cell<T>> {
        self.cell.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn resolve(&self, outcome: Outcome<T>) -> bool {
        let wakers = {
            let mut cell = self.lock();
            if !cell.state.is_pending() {
                return false;
            }
            cell.state = match outcome {
                Outcome::Completed(value) => State::Completed(Some(value)),
                Outcome::Failed(cause) => State::Failed(Some(cause)),
                Outcome::Cancelled => State::Cancelled,
            };
            std::mem::take(&mut cell.wakers)
        };

        self.condvar.notify_all();
        wakers.into_iter().for_each(Waker::wake);
        true
    }
}

struct Cell<T> {
    state: State<T>,
    wakers: Vec<Waker>,
}

impl<T> Default for Cell<T> {
    fn default() -> Self {
        Self { state: State::Pending, wakers: Vec::new() }
    }
}

// the value and cause are moved out to the first retriever, the variant stays
enum State<T> {
    Pending,
    Completed(Option<T>),
    Failed(Option<ExchangeError>),
    Cancelled,
}

impl<T> State<T> {
    fn is_pending(&self) -> bool {
        matches!(self, State::Pending)
    }

    /// Returns `None` while the outcome is unresolved
    fn try_take(&mut self) -> Option<Result<T, OutcomeError>> {
        match self {
            State::Pending => None,
            State::Completed(value) => Some(value.take().ok_or(OutcomeError::Retrieved)),
            State::Failed(cause) => Some(Err(cause.take().map_or(OutcomeError::Retrieved, OutcomeError::Failed))),
            State::Cancelled => Some(Err(OutcomeError::Cancelled)),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            State::Pending => "pending",
            State::Completed(_) => "completed",
            State::Failed(_) => "failed",
            State::Cancelled => "cancelled",
        }
    }
}

/// Resolving half of an exchange outcome.
///
/// Dropping an unresolved promise cancels the outcome, so nobody waits on an exchange
/// that can no longer finish.
pub(crate) struct Promise<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Promise<T> {
    pub(crate) fn complete(&self, value: T) -> bool {
        self.shared.resolve(Outcome::Completed(value))
    }

    pub(crate) fn fail(&self, cause: ExchangeError) -> bool {
        self.shared.resolve(Outcome::Failed(cause))
    }

    pub(crate) fn cancel(&self) -> bool {
        self.shared.resolve(Outcome::Cancelled)
    }

}

impl<T> Drop for Promise<T> {
    fn drop(&mut self) {
        self.shared.resolve(Outcome::Cancelled);
    }
}

/// Caller-visible handle over the outcome of an exchange.
///
/// Clones observe the same outcome. The completed value, or the failure cause, is
/// handed to the first retriever; later retrievals return [`OutcomeError::Retrieved`]
/// while the status queries keep answering.
pub struct ExchangeFuture<T> {
    shared: Arc<Shared<T>>,
}

impl<T> ExchangeFuture<T> {
    /// Returns true once the outcome is resolved, whichever way
    pub fn is_done(&self) -> bool {
        !self.shared.lock().state.is_pending()
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.shared.lock().state, State::Cancelled)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.shared.lock().state, State::Failed(_))
    }

    /// Cancels the outcome, returns false if it was already resolved
    pub fn cancel(&self) -> bool {
        self.shared.resolve(Outcome::Cancelled)
    }

    /// Blocks the current thread until the outcome is resolved
    pub fn get(&self) -> Result<T, OutcomeError> {
        let mut cell = self.shared.lock();
        loop {
            if let Some(result) = cell.state.try_take() {
                return result;
            }
            cell = self.shared.condvar.wait(cell).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Like [`get`](ExchangeFuture::get), giving up with [`OutcomeError::Timeout`] after `timeout`
    pub fn get_timeout(&self, timeout: Duration) -> Result<T, OutcomeError> {
        let mut cell = self.shared.lock();
        if let Some(result) = cell.state.try_take() {
            return result;
        }

        // a deadline past the clock's range is no deadline at all
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            drop(cell);
            return self.get();
        };

        loop {
            if let Some(result) = cell.state.try_take() {
                return result;
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(OutcomeError::Timeout(timeout));
            }

            let (guard, _) =
                self.shared.condvar.wait_timeout(cell, deadline - now).unwrap_or_else(PoisonError::into_inner);
            cell = guard;
        }
    }
}

impl<T> Clone for ExchangeFuture<T> {
    fn clone(&self) -> Self {
        Self { shared: Arc::clone(&self.shared) }
    }
}

impl<T> Future for ExchangeFuture<T> {
    type Output = Result<T, OutcomeError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut cell = self.shared.lock();
        if let Some(result) = cell.state.try_take() {
            return Poll::Ready(result);
        }

        if !cell.wakers.iter().any(|waker| waker.will_wake(cx.waker())) {
            cell.wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }
}

impl<T> fmt::Debug for ExchangeFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExchangeFuture").field("state", &self.shared.lock().state.name()).finish()
    }
}
