//! Shared attribute store of an exchange.
//!
//! [`HttpContext`] carries the live request, connection and response of the running
//! exchange to protocol interceptors, plus a type-keyed bag of interceptor-defined
//! attributes. It is a cheap, cloneable handle: the caller keeps one clone, the
//! [`ExchangeHandler`](crate::exchange::ExchangeHandler) borrows another, and both
//! observe the same state. A context may be reused by a following exchange, whose
//! values then overwrite the previous ones.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use http::Extensions;

use crate::connection::ClientConnection;
use crate::protocol::{RequestHead, ResponseHead};

#[derive(Clone, Default)]
pub struct HttpContext {
    inner: Arc<Mutex<ContextState>>,
}

#[derive(Default)]
struct ContextState {
    request: Option<RequestHead>,
    response: Option<ResponseHead>,
    connection: Option<Arc<dyn ClientConnection>>,
    attributes: Extensions,
}

impl HttpContext {
    pub fn new() -> Self {
        Self::default()
    }

    // a panicking interceptor must not make the context unusable for cleanup
    fn state(&self) -> MutexGuard<'_, ContextState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the request currently being executed, as last published
    pub fn request(&self) -> Option<RequestHead> {
        self.state().request.clone()
    }

    pub fn set_request(&self, request: RequestHead) {
        self.state().request = Some(request);
    }

    /// Returns the response currently being consumed, as last published
    pub fn response(&self) -> Option<ResponseHead> {
        self.state().response.clone()
    }

    pub fn set_response(&self, response: ResponseHead) {
        self.state().response = Some(response);
    }

    /// Returns the connection carrying the current exchange
    pub fn connection(&self) -> Option<Arc<dyn ClientConnection>> {
        self.state().connection.clone()
    }

    pub fn set_connection(&self, connection: Arc<dyn ClientConnection>) {
        self.state().connection = Some(connection);
    }

    /// Reads an interceptor-defined attribute, keyed by its type
    pub fn attribute<T: Clone + Send + Sync + 'static>(&self) -> Option<T> {
        self.state().attributes.get::<T>().cloned()
    }

    /// Stores an interceptor-defined attribute, returning the previous value of the same type
    pub fn set_attribute<T: Clone + Send + Sync + 'static>(&self, value: T) -> Option<T> {
        self.state().attributes.insert(value)
    }

    pub fn remove_attribute<T: Clone + Send + Sync + 'static>(&self) -> Option<T> {
        self.state().attributes.remove::<T>()
    }

    /// Returns true if both handles point at the same context
    pub fn ptr_eq(&self, other: &HttpContext) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for HttpContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("HttpContext")
            .field("request", &state.request)
            .field("response", &state.response)
            .field("connection", &state.connection.is_some())
            .field("attributes", &state.attributes.len())
            .finish()
    }
}
