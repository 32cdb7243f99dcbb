//! Cross-cutting protocol processing
//!
//! An [`HttpProcessor`] is applied to every outgoing request right after it was
//! generated and to every incoming response right after its head was received.
//! [`ProcessorChain`] is the standard implementation: an ordered list of
//! independently fallible interceptors where the first failure short-circuits the
//! rest of the chain.

mod interceptors;

pub use interceptors::RequestContent;
pub use interceptors::RequestUserAgent;
pub use interceptors::ResponseConformance;

use std::fmt;

use crate::context::HttpContext;
use crate::protocol::{ProtocolError, RequestHead, ResponseHead};

#[cfg_attr(test, mockall::automock)]
pub trait HttpProcessor: Send + Sync {
    fn process_request(&self, request: &mut RequestHead, context: &HttpContext) -> Result<(), ProtocolError>;

    fn process_response(&self, response: &mut ResponseHead, context: &HttpContext) -> Result<(), ProtocolError>;
}

pub trait RequestInterceptor: Send + Sync {
    fn process(&self, request: &mut RequestHead, context: &HttpContext) -> Result<(), ProtocolError>;
}

pub trait ResponseInterceptor: Send + Sync {
    fn process(&self, response: &mut ResponseHead, context: &HttpContext) -> Result<(), ProtocolError>;
}

struct FnRequestInterceptor<F>(F);

impl<F> RequestInterceptor for FnRequestInterceptor<F>
where
    F: Fn(&mut RequestHead, &HttpContext) -> Result<(), ProtocolError> + Send + Sync,
{
    fn process(&self, request: &mut RequestHead, context: &HttpContext) -> Result<(), ProtocolError> {
        (self.0)(request, context)
    }
}

pub fn request_interceptor_fn<F>(f: F) -> impl RequestInterceptor
where
    F: Fn(&mut RequestHead, &HttpContext) -> Result<(), ProtocolError> + Send + Sync,
{
    FnRequestInterceptor(f)
}

struct FnResponseInterceptor<F>(F);

impl<F> ResponseInterceptor for FnResponseInterceptor<F>
where
    F: Fn(&mut ResponseHead, &HttpContext) -> Result<(), ProtocolError> + Send + Sync,
{
    fn process(&self, response: &mut ResponseHead, context: &HttpContext) -> Result<(), ProtocolError> {
        (self.0)(response, context)
    }
}

pub fn response_interceptor_fn<F>(f: F) -> impl ResponseInterceptor
where
    F: Fn(&mut ResponseHead, &HttpContext) -> Result<(), ProtocolError> + Send + Sync,
{
    FnResponseInterceptor(f)
}

/// Ordered chain of request and response interceptors
pub struct ProcessorChain {
    request_interceptors: Vec<Box<dyn RequestInterceptor>>,
    response_interceptors: Vec<Box<dyn ResponseInterceptor>>,
}

impl ProcessorChain {
    pub fn builder() -> ProcessorChainBuilder {
        ProcessorChainBuilder::new()
    }

    /// The interceptors every HTTP/1.1 client exchange should run through
    pub fn standard() -> Self {
        Self::builder()
            .add_request_last(RequestContent)
            .add_request_last(RequestUserAgent::default())
            .add_response_last(ResponseConformance)
            .build()
    }
}

impl HttpProcessor for ProcessorChain {
    fn process_request(&self, request: &mut RequestHead, context: &HttpContext) -> Result<(), ProtocolError> {
        for interceptor in self.request_interceptors.iter() {
            interceptor.process(request, context)?;
        }
        Ok(())
    }

    fn process_response(&self, response: &mut ResponseHead, context: &HttpContext) -> Result<(), ProtocolError> {
        for interceptor in self.response_interceptors.iter() {
            interceptor.process(response, context)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ProcessorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorChain")
            .field("request_interceptors", &self.request_interceptors.len())
            .field("response_interceptors", &self.response_interceptors.len())
            .finish()
    }
}

pub struct ProcessorChainBuilder {
    request_interceptors: Vec<Box<dyn RequestInterceptor>>,
    response_interceptors: Vec<Box<dyn ResponseInterceptor>>,
}

impl ProcessorChainBuilder {
    fn new() -> Self {
        Self { request_interceptors: vec![], response_interceptors: vec![] }
    }

    pub fn add_request_last<I: RequestInterceptor + 'static>(mut self, interceptor: I) -> Self {
        self.request_interceptors.push(Box::new(interceptor));
        self
    }

    pub fn add_request_first<I: RequestInterceptor + 'static>(mut self, interceptor: I) -> Self {
        self.request_interceptors.insert(0, Box::new(interceptor));
        self
    }

    pub fn add_response_last<I: ResponseInterceptor + 'static>(mut self, interceptor: I) -> Self {
        self.response_interceptors.push(Box::new(interceptor));
        self
    }

    pub fn add_response_first<I: ResponseInterceptor + 'static>(mut self, interceptor: I) -> Self {
        self.response_interceptors.insert(0, Box::new(interceptor));
        self
    }

    pub fn build(self) -> ProcessorChain {
        ProcessorChain { request_interceptors: self.request_interceptors, response_interceptors: self.response_interceptors }
    }
}

impl fmt::Debug for ProcessorChainBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorChainBuilder")
            .field("request_interceptors", &self.request_interceptors.len())
            .field("response_interceptors", &self.response_interceptors.len())
            .finish()
    }
}
