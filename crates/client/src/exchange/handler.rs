use std::fmt;
use std::sync::Arc;

use http::Version;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::codec::{ContentDecoder, ContentEncoder};
use crate::connection::ClientConnection;
use crate::context::HttpContext;
use crate::exchange::future::{ExchangeFuture, Outcome, Promise, promise};
use crate::exchange::{ConnectionReuseStrategy, DefaultConnectionReuseStrategy, RequestProducer, ResponseConsumer};
use crate::processor::HttpProcessor;
use crate::protocol::{ExchangeError, RequestHead, ResponseHead};

/// Lifecycle of an exchange as seen by its handler.
///
/// `Completed`, `Failed` and `Cancelled` are terminal: once reached the handler
/// ignores every further terminal event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    Pending,
    RequestInFlight,
    RequestSent,
    ResponseInFlight,
    Completed,
    Failed,
    Cancelled,
}

impl ExchangeState {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExchangeState::Completed | ExchangeState::Failed | ExchangeState::Cancelled)
    }
}

#[derive(Error, Debug)]
pub enum ExchangeBuildError {
    #[error("request producer must be set")]
    MissingProducer,
    #[error("response consumer must be set")]
    MissingConsumer,
    #[error("context must be set")]
    MissingContext,
    #[error("connection must be set")]
    MissingConnection,
    #[error("protocol processor must be set")]
    MissingProcessor,
}

pub struct ExchangeHandlerBuilder<T> {
    producer: Option<Box<dyn RequestProducer>>,
    consumer: Option<Box<dyn ResponseConsumer<T>>>,
    version: Option<Version>,
    context: Option<HttpContext>,
    connection: Option<Arc<dyn ClientConnection>>,
    processor: Option<Arc<dyn HttpProcessor>>,
    reuse_strategy: Option<Arc<dyn ConnectionReuseStrategy>>,
}

impl<T> fmt::Debug for ExchangeHandlerBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExchangeHandlerBuilder")
            .field("producer", &self.producer.is_some())
            .field("consumer", &self.consumer.is_some())
            .field("version", &self.version)
            .field("context", &self.context.is_some())
            .field("connection", &self.connection.is_some())
            .field("processor", &self.processor.is_some())
            .field("reuse_strategy", &self.reuse_strategy.is_some())
            .finish()
    }
}

impl<T> ExchangeHandlerBuilder<T> {
    fn new() -> Self {
        Self {
            producer: None,
            consumer: None,
            version: None,
            context: None,
            connection: None,
            processor: None,
            reuse_strategy: None,
        }
    }

    pub fn producer(mut self, producer: impl RequestProducer + 'static) -> Self {
        self.producer = Some(Box::new(producer));
        self
    }

    pub fn consumer(mut self, consumer: impl ResponseConsumer<T> + 'static) -> Self {
        self.consumer = Some(Box::new(consumer));
        self
    }

    /// Overrides the protocol version of the generated request
    pub fn version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }

    pub fn context(mut self, context: HttpContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn connection(mut self, connection: Arc<dyn ClientConnection>) -> Self {
        self.connection = Some(connection);
        self
    }

    pub fn processor(mut self, processor: Arc<dyn HttpProcessor>) -> Self {
        self.processor = Some(processor);
        self
    }

    /// Defaults to [`DefaultConnectionReuseStrategy`]
    pub fn reuse_strategy(mut self, reuse_strategy: Arc<dyn ConnectionReuseStrategy>) -> Self {
        self.reuse_strategy = Some(reuse_strategy);
        self
    }

    pub fn build(self) -> Result<ExchangeHandler<T>, ExchangeBuildError> {
        let producer = self.producer.ok_or(ExchangeBuildError::MissingProducer)?;
        let consumer = self.consumer.ok_or(ExchangeBuildError::MissingConsumer)?;
        let context = self.context.ok_or(ExchangeBuildError::MissingContext)?;
        let connection = self.connection.ok_or(ExchangeBuildError::MissingConnection)?;
        let processor = self.processor.ok_or(ExchangeBuildError::MissingProcessor)?;
        let reuse_strategy = self.reuse_strategy.unwrap_or_else(|| Arc::new(DefaultConnectionReuseStrategy));

        let (promise, future) = promise();
        Ok(ExchangeHandler {
            producer,
            consumer,
            version: self.version,
            context,
            connection,
            processor,
            reuse_strategy,
            promise,
            future,
            state: ExchangeState::Pending,
            request_sent: false,
            keep_alive: false,
            closed: false,
        })
    }
}

/// Drives a single request/response exchange on behalf of an I/O reactor.
///
/// The reactor calls back into the handler from one thread as the connection makes
/// progress; the caller observes the result through the [`ExchangeFuture`] returned
/// by [`future`](ExchangeHandler::future). Every terminal path closes the producer
/// and then the consumer, exactly once each, before the outcome is resolved.
/// Errors raised while notifying collaborators on those paths are returned only
/// after cleanup ran.
///
/// The connection and the context are borrowed: the handler publishes into the
/// context but never closes the connection. Dropping a handler that did not reach
/// a terminal state closes it.
pub struct ExchangeHandler<T> {
    producer: Box<dyn RequestProducer>,
    consumer: Box<dyn ResponseConsumer<T>>,
    version: Option<Version>,
    context: HttpContext,
    connection: Arc<dyn ClientConnection>,
    processor: Arc<dyn HttpProcessor>,
    reuse_strategy: Arc<dyn ConnectionReuseStrategy>,
    promise: Promise<T>,
    future: ExchangeFuture<T>,
    state: ExchangeState,
    request_sent: bool,
    keep_alive: bool,
    closed: bool,
}

impl<T> ExchangeHandler<T> {
    pub fn builder() -> ExchangeHandlerBuilder<T> {
        ExchangeHandlerBuilder::new()
    }

    /// Returns a handle over the outcome of this exchange
    pub fn future(&self) -> ExchangeFuture<T> {
        self.future.clone()
    }

    pub fn context(&self) -> &HttpContext {
        &self.context
    }

    pub fn state(&self) -> ExchangeState {
        self.state
    }

    /// Returns true once the whole request was written
    pub fn request_sent(&self) -> bool {
        self.request_sent
    }

    /// Whether the connection can be reused after this exchange, decided when the response was received
    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    /// Asks the consumer whether it is done, the outcome is not inspected
    pub fn is_done(&self) -> bool {
        self.consumer.is_done()
    }

    /// Fails with [`ExchangeError::Terminated`] once the exchange reached a terminal state
    pub fn generate_request(&mut self) -> Result<RequestHead, ExchangeError> {
        if self.state.is_terminal() {
            debug!(state = ?self.state, "exchange already terminated, ignore request generation");
            return Err(ExchangeError::Terminated);
        }

        let mut request = self.producer.generate_request()?;
        if let Some(version) = self.version {
            *request.version_mut() = version;
        }

        self.context.set_request(request.clone());
        self.context.set_connection(Arc::clone(&self.connection));
        self.processor.process_request(&mut request, &self.context)?;
        self.context.set_request(request.clone());

        debug!(method = %request.method(), uri = %request.uri(), "request generated");
        self.transition(ExchangeState::RequestInFlight);
        Ok(request)
    }

    pub fn produce_content(
        &mut self,
        encoder: &mut dyn ContentEncoder,
        connection: &dyn ClientConnection,
    ) -> Result<(), ExchangeError> {
        if self.state.is_terminal() {
            debug!(state = ?self.state, "exchange already terminated, ignore request content");
            return Ok(());
        }
        self.producer.produce_content(encoder, connection)
    }

    pub fn request_completed(&mut self) -> Result<(), ExchangeError> {
        if self.state.is_terminal() {
            debug!(state = ?self.state, "exchange already terminated, ignore request completion");
            return Ok(());
        }

        self.producer.request_completed(&self.context)?;
        self.request_sent = true;
        self.transition(ExchangeState::RequestSent);
        Ok(())
    }

    pub fn response_received(&mut self, mut response: ResponseHead) -> Result<(), ExchangeError> {
        if self.state.is_terminal() {
            debug!(state = ?self.state, "exchange already terminated, ignore response head");
            return Ok(());
        }

        self.context.set_response(response.clone());
        self.processor.process_response(&mut response, &self.context)?;
        self.context.set_response(response.clone());

        self.keep_alive = self.reuse_strategy.keep_alive(&response, &self.context);
        debug!(status = %response.status(), keep_alive = self.keep_alive, "response received");
        self.transition(ExchangeState::ResponseInFlight);

        self.consumer.response_received(response)
    }

    pub fn consume_content(
        &mut self,
        decoder: &mut dyn ContentDecoder,
        connection: &dyn ClientConnection,
    ) -> Result<(), ExchangeError> {
        if self.state.is_terminal() {
            debug!(state = ?self.state, "exchange already terminated, ignore response content");
            return Ok(());
        }
        self.consumer.consume_content(decoder, connection)
    }

    pub fn response_completed(&mut self) -> Result<(), ExchangeError> {
        if self.state.is_terminal() {
            debug!(state = ?self.state, "exchange already terminated, ignore response completion");
            return Ok(());
        }

        let completion = self.consumer.response_completed(&self.context);
        self.close_collaborators();

        match completion {
            Ok(()) => {
                let outcome = match self.consumer.take_exception() {
                    Some(exception) => Outcome::Failed(exception),
                    None => self.consumer.take_result().map_or(Outcome::Failed(ExchangeError::MissingResult), Outcome::Completed),
                };
                self.resolve(outcome);
                Ok(())
            }
            Err(e) => {
                error!(cause = %e, "response consumer failed to complete");
                let cause = self
                    .consumer
                    .take_exception()
                    .unwrap_or_else(|| ExchangeError::consumer(format!("response completion failed: {e}")));
                self.resolve(Outcome::Failed(cause));
                Err(e)
            }
        }
    }

    /// Fails the exchange with `cause`.
    ///
    /// The producer is only notified while the request is still being sent, the
    /// consumer always is. The first notification error is returned once both
    /// collaborators are closed and the outcome holds `cause`.
    pub fn failed(&mut self, cause: ExchangeError) -> Result<(), ExchangeError> {
        if self.state.is_terminal() {
            debug!(state = ?self.state, %cause, "exchange already terminated, ignore failure");
            return Ok(());
        }
        debug!(%cause, request_sent = self.request_sent, "exchange failed");

        let producer_notified = if self.request_sent { Ok(()) } else { self.producer.failed(&cause) };
        let consumer_notified = self.consumer.failed(&cause);

        self.close_collaborators();
        self.resolve(Outcome::Failed(cause));

        if let Err(e) = &producer_notified {
            error!(cause = %e, "request producer failed to handle exchange failure");
        }
        if let Err(e) = &consumer_notified {
            error!(cause = %e, "response consumer failed to handle exchange failure");
        }
        producer_notified.and(consumer_notified)
    }

    /// Cancels the exchange, returns the consumer's answer to the cancellation
    pub fn cancel(&mut self) -> bool {
        if self.state.is_terminal() {
            debug!(state = ?self.state, "exchange already terminated, ignore cancel");
            return false;
        }

        let cancelled = self.consumer.cancel();
        self.close_collaborators();
        self.resolve(Outcome::Cancelled);
        cancelled
    }

    /// The peer closed the connection before the response completed.
    ///
    /// Only the consumer is notified, even when the request was still being sent.
    pub fn input_terminated(&mut self) -> Result<(), ExchangeError> {
        if self.state.is_terminal() {
            debug!(state = ?self.state, "exchange already terminated, ignore input termination");
            return Ok(());
        }

        let cause = ExchangeError::connection_closed("connection closed before the response completed");
        let consumer_notified = self.consumer.failed(&cause);

        self.close_collaborators();
        self.resolve(Outcome::Failed(cause));

        if let Err(e) = &consumer_notified {
            error!(cause = %e, "response consumer failed to handle input termination");
        }
        consumer_notified
    }

    /// Tears the exchange down, a pending outcome becomes cancelled
    pub fn close(&mut self) {
        if self.state.is_terminal() {
            return;
        }

        self.close_collaborators();
        self.resolve(Outcome::Cancelled);
    }

    fn transition(&mut self, next: ExchangeState) {
        if !self.state.is_terminal() {
            self.state = next;
        }
    }

    fn close_collaborators(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Err(e) = self.producer.close() {
            warn!(cause = %e, "failed to close request producer");
        }
        if let Err(e) = self.consumer.close() {
            warn!(cause = %e, "failed to close response consumer");
        }
    }

    fn resolve(&mut self, outcome: Outcome<T>) {
        self.state = match &outcome {
            Outcome::Completed(_) => ExchangeState::Completed,
            Outcome::Failed(_) => ExchangeState::Failed,
            Outcome::Cancelled => ExchangeState::Cancelled,
        };

        let resolved = match outcome {
            Outcome::Completed(result) => self.promise.complete(result),
            Outcome::Failed(cause) => self.promise.fail(cause),
            Outcome::Cancelled => self.promise.cancel(),
        };
        if !resolved {
            debug!(state = ?self.state, "exchange outcome was already resolved by the caller");
        }
    }
}

impl<T> Drop for ExchangeHandler<T> {
    fn drop(&mut self) {
        if !self.state.is_terminal() {
            debug!(state = ?self.state, "exchange handler dropped before termination");
            self.close();
        }
    }
}

impl<T> fmt::Debug for ExchangeHandler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExchangeHandler")
            .field("state", &self.state)
            .field("version", &self.version)
            .field("request_sent", &self.request_sent)
            .field("keep_alive", &self.keep_alive)
            .field("future", &self.future)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{LengthDecoder, LengthEncoder, MockContentDecoder, MockContentEncoder, RequestHeadEncoder, ResponseHeadDecoder};
    use crate::connection::MockClientConnection;
    use crate::exchange::future::OutcomeError;
    use crate::exchange::{BasicRequestProducer, BasicResponseConsumer, MockConnectionReuseStrategy, MockRequestProducer};
    use crate::processor::{MockHttpProcessor, ProcessorChain};
    use crate::protocol::PayloadSize;
    use bytes::{Bytes, BytesMut};
    use http::{HeaderValue, Method, Request, Response, StatusCode, header};
    use indoc::indoc;
    use mockall::mock;
    use std::io;
    use std::thread;
    use std::time::Duration;
    use tokio_util::codec::{Decoder, Encoder};

    mock! {
        Consumer {}

        impl ResponseConsumer<String> for Consumer {
            fn response_received(&mut self, response: ResponseHead) -> Result<(), ExchangeError>;
            fn consume_content(
                &mut self,
                decoder: &mut dyn ContentDecoder,
                connection: &dyn ClientConnection,
            ) -> Result<(), ExchangeError>;
            fn response_completed(&mut self, context: &HttpContext) -> Result<(), ExchangeError>;
            fn failed(&mut self, cause: &ExchangeError) -> Result<(), ExchangeError>;
            fn cancel(&mut self) -> bool;
            fn take_result(&mut self) -> Option<String>;
            fn take_exception(&mut self) -> Option<ExchangeError>;
            fn is_done(&self) -> bool;
            fn close(&mut self) -> io::Result<()>;
        }
    }

    struct Fixture {
        producer: MockRequestProducer,
        consumer: MockConsumer,
        processor: MockHttpProcessor,
        connection: MockClientConnection,
        context: HttpContext,
    }

    impl Fixture {
        /// Collaborators whose close is expected exactly once
        fn new() -> Self {
            let mut producer = MockRequestProducer::new();
            producer.expect_close().times(1).returning(|| Ok(()));
            let mut consumer = MockConsumer::new();
            consumer.expect_close().times(1).returning(|| Ok(()));

            Self {
                producer,
                consumer,
                processor: MockHttpProcessor::new(),
                connection: MockClientConnection::new(),
                context: HttpContext::new(),
            }
        }

        fn build(self) -> ExchangeHandler<String> {
            let mut reuse_strategy = MockConnectionReuseStrategy::new();
            reuse_strategy.expect_keep_alive().return_const(true);

            ExchangeHandler::builder()
                .producer(self.producer)
                .consumer(self.consumer)
                .context(self.context)
                .connection(Arc::new(self.connection))
                .processor(Arc::new(self.processor))
                .reuse_strategy(Arc::new(reuse_strategy))
                .build()
                .unwrap()
        }
    }

    fn get_root() -> RequestHead {
        Request::builder().method(Method::GET).uri("/").header("x-marker", "42").body(()).unwrap()
    }

    fn ooopsie() -> ExchangeError {
        ExchangeError::other("ooopsie")
    }

    #[test]
    fn build_requires_collaborators() {
        let error = ExchangeHandler::<String>::builder()
            .consumer(MockConsumer::new())
            .context(HttpContext::new())
            .connection(Arc::new(MockClientConnection::new()))
            .processor(Arc::new(MockHttpProcessor::new()))
            .build()
            .unwrap_err();
        assert!(matches!(error, ExchangeBuildError::MissingProducer));

        let error = ExchangeHandler::<String>::builder()
            .producer(MockRequestProducer::new())
            .context(HttpContext::new())
            .connection(Arc::new(MockClientConnection::new()))
            .processor(Arc::new(MockHttpProcessor::new()))
            .build()
            .unwrap_err();
        assert!(matches!(error, ExchangeBuildError::MissingConsumer));

        let error = ExchangeHandler::<String>::builder()
            .producer(MockRequestProducer::new())
            .consumer(MockConsumer::new())
            .connection(Arc::new(MockClientConnection::new()))
            .processor(Arc::new(MockHttpProcessor::new()))
            .build()
            .unwrap_err();
        assert!(matches!(error, ExchangeBuildError::MissingContext));

        let error = ExchangeHandler::<String>::builder()
            .producer(MockRequestProducer::new())
            .consumer(MockConsumer::new())
            .context(HttpContext::new())
            .processor(Arc::new(MockHttpProcessor::new()))
            .build()
            .unwrap_err();
        assert!(matches!(error, ExchangeBuildError::MissingConnection));

        let error = ExchangeHandler::<String>::builder()
            .producer(MockRequestProducer::new())
            .consumer(MockConsumer::new())
            .context(HttpContext::new())
            .connection(Arc::new(MockClientConnection::new()))
            .build()
            .unwrap_err();
        assert!(matches!(error, ExchangeBuildError::MissingProcessor));
    }

    #[test]
    fn close_before_terminal_cancels() {
        let handler = Fixture::new().build();
        let future = handler.future();
        assert!(!future.is_cancelled());

        let mut handler = handler;
        handler.close();

        assert!(future.is_cancelled());
        assert!(!future.is_failed());
        assert_eq!(handler.state(), ExchangeState::Cancelled);

        handler.close();
    }

    #[test]
    fn generate_request_publishes_into_context() {
        let mut fixture = Fixture::new();
        fixture.producer.expect_generate_request().times(1).returning(|| Ok(get_root()));
        fixture
            .processor
            .expect_process_request()
            .withf(|request, context| {
                request.uri() == "/"
                    && context.request().is_some_and(|published| published.headers().get("x-marker").is_some())
                    && context.connection().is_some()
            })
            .times(1)
            .returning(|request, _| {
                request.headers_mut().insert("x-processed", HeaderValue::from_static("yes"));
                Ok(())
            });
        let context = fixture.context.clone();

        let mut handler = fixture.build();
        let request = handler.generate_request().unwrap();

        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.uri(), "/");
        assert_eq!(request.headers().get("x-marker").unwrap(), "42");
        assert_eq!(request.headers().get("x-processed").unwrap(), "yes");
        assert_eq!(context.request().unwrap().headers().get("x-processed").unwrap(), "yes");
        assert!(context.connection().is_some());
        assert_eq!(handler.state(), ExchangeState::RequestInFlight);
    }

    #[test]
    fn version_override() {
        let mut fixture = Fixture::new();
        fixture.producer.expect_generate_request().returning(|| Ok(get_root()));
        fixture.processor.expect_process_request().returning(|_, _| Ok(()));

        let mut handler = ExchangeHandler::builder()
            .producer(fixture.producer)
            .consumer(fixture.consumer)
            .version(Version::HTTP_10)
            .context(fixture.context)
            .connection(Arc::new(fixture.connection))
            .processor(Arc::new(fixture.processor))
            .build()
            .unwrap();

        assert_eq!(handler.generate_request().unwrap().version(), Version::HTTP_10);
    }

    #[test]
    fn processor_error_propagates() {
        let mut fixture = Fixture::new();
        fixture.producer.expect_generate_request().returning(|| Ok(get_root()));
        fixture
            .processor
            .expect_process_request()
            .returning(|_, _| Err(crate::protocol::ProtocolError::invalid_header("rejected")));

        let mut handler = fixture.build();
        let error = handler.generate_request().unwrap_err();

        assert!(error.is_protocol());
        assert!(!handler.future().is_done());
    }

    #[test]
    fn produce_content_is_passed_through() {
        let mut fixture = Fixture::new();
        fixture.producer.expect_produce_content().times(2).returning(|_, _| Ok(()));
        let mut handler = fixture.build();
        let connection = MockClientConnection::new();

        let mut encoder = MockContentEncoder::new();
        encoder.expect_is_completed().return_const(false);
        handler.produce_content(&mut encoder, &connection).unwrap();

        let mut encoder = MockContentEncoder::new();
        encoder.expect_is_completed().return_const(true);
        handler.produce_content(&mut encoder, &connection).unwrap();
    }

    #[test]
    fn request_completed_passes_context() {
        let mut fixture = Fixture::new();
        let context = fixture.context.clone();
        fixture
            .producer
            .expect_request_completed()
            .withf(move |ctx| ctx.ptr_eq(&context))
            .times(1)
            .returning(|_| Ok(()));

        let mut handler = fixture.build();
        handler.request_completed().unwrap();

        assert!(handler.request_sent());
        assert_eq!(handler.state(), ExchangeState::RequestSent);
    }

    #[test]
    fn response_received_publishes_into_context() {
        let mut fixture = Fixture::new();
        fixture
            .processor
            .expect_process_response()
            .withf(|response, context| {
                response.status() == StatusCode::OK && context.response().is_some_and(|r| r.status() == StatusCode::OK)
            })
            .times(1)
            .returning(|_, _| Ok(()));
        fixture
            .consumer
            .expect_response_received()
            .withf(|response| response.status() == StatusCode::OK)
            .times(1)
            .returning(|_| Ok(()));
        let context = fixture.context.clone();

        let mut handler = fixture.build();
        assert!(!handler.keep_alive());
        handler.response_received(Response::builder().status(StatusCode::OK).body(()).unwrap()).unwrap();

        assert_eq!(context.response().unwrap().status(), StatusCode::OK);
        assert!(handler.keep_alive());
        assert_eq!(handler.state(), ExchangeState::ResponseInFlight);
    }

    #[test]
    fn consume_content_is_passed_through() {
        let mut fixture = Fixture::new();
        fixture.consumer.expect_consume_content().times(1).returning(|_, _| Ok(()));
        let mut handler = fixture.build();

        let mut decoder = MockContentDecoder::new();
        handler.consume_content(&mut decoder, &MockClientConnection::new()).unwrap();
    }

    #[test]
    fn failed_before_request_sent_notifies_both() {
        let mut fixture = Fixture::new();
        fixture.producer.expect_failed().withf(|cause| cause.to_string() == "ooopsie").times(1).returning(|_| Ok(()));
        fixture.consumer.expect_failed().withf(|cause| cause.to_string() == "ooopsie").times(1).returning(|_| Ok(()));

        let mut handler = fixture.build();
        let future = handler.future();
        handler.failed(ooopsie()).unwrap();

        assert!(future.is_failed());
        assert_eq!(future.get().unwrap_err().into_cause().unwrap().to_string(), "ooopsie");
        assert_eq!(handler.state(), ExchangeState::Failed);
    }

    #[test]
    fn failed_after_request_sent_notifies_consumer_only() {
        let mut fixture = Fixture::new();
        fixture.producer.expect_request_completed().returning(|_| Ok(()));
        fixture.producer.expect_failed().never();
        fixture.consumer.expect_failed().times(1).returning(|_| Ok(()));

        let mut handler = fixture.build();
        handler.request_completed().unwrap();
        handler.failed(ooopsie()).unwrap();

        assert_eq!(handler.future().get().unwrap_err().into_cause().unwrap().to_string(), "ooopsie");
    }

    #[test]
    fn failed_with_raising_consumer_still_cleans_up() {
        let mut fixture = Fixture::new();
        fixture.producer.expect_failed().returning(|_| Ok(()));
        fixture.consumer.expect_failed().times(1).returning(|_| Err(ExchangeError::consumer("boom")));

        let mut handler = fixture.build();
        let error = handler.failed(ooopsie()).unwrap_err();

        assert!(matches!(error, ExchangeError::Consumer { .. }));
        assert_eq!(handler.future().get().unwrap_err().into_cause().unwrap().to_string(), "ooopsie");
    }

    #[test]
    fn failed_with_raising_producer_still_notifies_consumer() {
        let mut fixture = Fixture::new();
        fixture.producer.expect_failed().times(1).returning(|_| Err(ExchangeError::producer("boom")));
        fixture.consumer.expect_failed().times(1).returning(|_| Err(ExchangeError::consumer("boom")));

        let mut handler = fixture.build();
        let error = handler.failed(ooopsie()).unwrap_err();

        assert!(matches!(error, ExchangeError::Producer { .. }));
        assert!(handler.future().is_failed());
    }

    #[test]
    fn cancel_notifies_consumer() {
        let mut fixture = Fixture::new();
        fixture.consumer.expect_cancel().times(1).return_const(true);

        let mut handler = fixture.build();
        let future = handler.future();

        assert!(handler.cancel());
        assert!(future.is_cancelled());
        assert!(!future.is_failed());
        assert!(matches!(future.get(), Err(OutcomeError::Cancelled)));
    }

    #[test]
    fn callbacks_after_termination_are_ignored() {
        let mut fixture = Fixture::new();
        fixture.consumer.expect_cancel().times(1).return_const(true);
        // no other producer or consumer expectation: a forwarded callback would panic

        let mut handler = fixture.build();
        assert!(handler.cancel());

        let error = handler.generate_request().unwrap_err();
        assert!(matches!(error, ExchangeError::Terminated));

        let connection = MockClientConnection::new();
        handler.produce_content(&mut MockContentEncoder::new(), &connection).unwrap();
        handler.request_completed().unwrap();
        handler.response_received(Response::builder().status(StatusCode::OK).body(()).unwrap()).unwrap();
        handler.consume_content(&mut MockContentDecoder::new(), &connection).unwrap();

        assert_eq!(handler.state(), ExchangeState::Cancelled);
        assert!(!handler.request_sent());
        assert!(handler.context().response().is_none());
    }

    #[test]
    fn builder_debug_shows_configured_collaborators() {
        let builder = ExchangeHandler::<String>::builder().context(HttpContext::new()).version(http::Version::HTTP_10);

        let debug = format!("{builder:?}");

        assert!(debug.contains("producer: false"));
        assert!(debug.contains("context: true"));
        assert!(debug.contains("HTTP/1.0"));
    }

    #[test]
    fn response_completed_with_result() {
        let mut fixture = Fixture::new();
        let context = fixture.context.clone();
        fixture
            .consumer
            .expect_response_completed()
            .withf(move |ctx| ctx.ptr_eq(&context))
            .times(1)
            .returning(|_| Ok(()));
        fixture.consumer.expect_take_exception().returning(|| None);
        fixture.consumer.expect_take_result().times(1).returning(|| Some("result".to_string()));

        let mut handler = fixture.build();
        handler.response_completed().unwrap();

        assert_eq!(handler.state(), ExchangeState::Completed);
        assert_eq!(handler.future().get().unwrap(), "result");
    }

    #[test]
    fn response_completed_with_exception() {
        let mut fixture = Fixture::new();
        fixture.consumer.expect_response_completed().returning(|_| Ok(()));
        fixture.consumer.expect_take_exception().times(1).returning(|| Some(ooopsie()));
        fixture.consumer.expect_take_result().never();

        let mut handler = fixture.build();
        handler.response_completed().unwrap();

        assert_eq!(handler.state(), ExchangeState::Failed);
        assert_eq!(handler.future().get().unwrap_err().into_cause().unwrap().to_string(), "ooopsie");
    }

    #[test]
    fn response_completed_without_result() {
        let mut fixture = Fixture::new();
        fixture.consumer.expect_response_completed().returning(|_| Ok(()));
        fixture.consumer.expect_take_exception().returning(|| None);
        fixture.consumer.expect_take_result().returning(|| None);

        let mut handler = fixture.build();
        handler.response_completed().unwrap();

        let cause = handler.future().get().unwrap_err().into_cause().unwrap();
        assert!(matches!(cause, ExchangeError::MissingResult));
    }

    #[test]
    fn response_completed_with_raising_consumer() {
        let mut fixture = Fixture::new();
        fixture.consumer.expect_response_completed().returning(|_| Err(ExchangeError::consumer("boom")));
        fixture.consumer.expect_take_exception().returning(|| None);
        fixture.consumer.expect_take_result().never();

        let mut handler = fixture.build();
        let error = handler.response_completed().unwrap_err();

        assert!(matches!(error, ExchangeError::Consumer { .. }));
        assert!(handler.future().is_failed());
    }

    #[test]
    fn input_terminated_fails_consumer() {
        let mut fixture = Fixture::new();
        fixture.producer.expect_failed().never();
        fixture.consumer.expect_failed().withf(|cause| cause.is_connection_closed()).times(1).returning(|_| Ok(()));

        let mut handler = fixture.build();
        handler.input_terminated().unwrap();

        let cause = handler.future().get().unwrap_err().into_cause().unwrap();
        assert!(cause.is_connection_closed());
    }

    #[test]
    fn terminal_state_is_absorbing() {
        let mut fixture = Fixture::new();
        fixture.producer.expect_failed().times(1).returning(|_| Ok(()));
        fixture.consumer.expect_failed().times(1).returning(|_| Ok(()));
        fixture.consumer.expect_cancel().never();
        fixture.consumer.expect_response_completed().never();

        let mut handler = fixture.build();
        let future = handler.future();
        handler.failed(ooopsie()).unwrap();

        handler.failed(ExchangeError::other("second")).unwrap();
        assert!(!handler.cancel());
        handler.response_completed().unwrap();
        handler.input_terminated().unwrap();
        handler.close();
        drop(handler);

        assert!(future.is_failed());
        assert_eq!(future.get().unwrap_err().into_cause().unwrap().to_string(), "ooopsie");
    }

    #[test]
    fn caller_cancellation_wins() {
        let mut fixture = Fixture::new();
        fixture.consumer.expect_response_completed().returning(|_| Ok(()));
        fixture.consumer.expect_take_exception().returning(|| None);
        fixture.consumer.expect_take_result().returning(|| Some("late".to_string()));

        let mut handler = fixture.build();
        let future = handler.future();
        assert!(future.cancel());

        handler.response_completed().unwrap();

        assert!(future.is_cancelled());
        assert_eq!(handler.state(), ExchangeState::Completed);
    }

    #[test]
    fn drop_closes_unfinished_exchange() {
        let handler = Fixture::new().build();
        let future = handler.future();

        drop(handler);

        assert!(future.is_cancelled());
    }

    #[test]
    fn is_done_asks_consumer() {
        let mut fixture = Fixture::new();
        fixture.consumer.expect_is_done().times(1).return_const(true);

        let handler = fixture.build();

        assert!(handler.is_done());
        assert!(!handler.future().is_done());
    }

    #[tokio::test]
    async fn outcome_awaited_while_reactor_runs_elsewhere() {
        let mut fixture = Fixture::new();
        fixture.consumer.expect_response_completed().returning(|_| Ok(()));
        fixture.consumer.expect_take_exception().returning(|| None);
        fixture.consumer.expect_take_result().returning(|| Some("from reactor".to_string()));

        let mut handler = fixture.build();
        let future = handler.future();

        let reactor = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            handler.response_completed().unwrap();
        });

        assert_eq!(future.await.unwrap(), "from reactor");
        reactor.join().unwrap();
    }

    #[test]
    fn full_exchange_over_codecs() {
        let mut connection = MockClientConnection::new();
        connection.expect_is_open().return_const(true);
        let connection: Arc<dyn ClientConnection> = Arc::new(connection);
        let context = HttpContext::new();

        let request = Request::builder().method(Method::POST).uri("http://example.com/echo").body(()).unwrap();
        let mut handler = ExchangeHandler::builder()
            .producer(BasicRequestProducer::new(request, Some(Bytes::from_static(b"ping"))))
            .consumer(BasicResponseConsumer::new())
            .context(context.clone())
            .connection(Arc::clone(&connection))
            .processor(Arc::new(ProcessorChain::standard()))
            .build()
            .unwrap();
        let future = handler.future();

        // request phase
        let request = handler.generate_request().unwrap();
        let payload_size = PayloadSize::from_headers(request.headers()).unwrap();
        assert_eq!(payload_size, PayloadSize::Length(4));
        assert!(request.headers().contains_key(header::USER_AGENT));

        let mut wire = BytesMut::new();
        RequestHeadEncoder.encode((request, payload_size), &mut wire).unwrap();
        let mut encoder = LengthEncoder::new(4);
        handler.produce_content(&mut encoder, connection.as_ref()).unwrap();
        assert!(encoder.is_completed());
        wire.extend_from_slice(&encoder.take_output());
        assert!(wire.starts_with(b"POST /echo HTTP/1.1\r\n"));
        assert!(wire.ends_with(b"\r\n\r\nping"));
        handler.request_completed().unwrap();

        // response phase
        let raw = indoc! {r##"
        HTTP/1.1 200 OK
        Content-Type: text/plain
        Content-Length: 4

        pong"##};
        let mut input = BytesMut::from(raw.replace('\n', "\r\n").as_str());
        let (response, payload_size) = ResponseHeadDecoder::new(Method::POST).decode(&mut input).unwrap().unwrap();
        handler.response_received(response).unwrap();
        assert!(handler.keep_alive());

        let PayloadSize::Length(length) = payload_size else { panic!("expected a length delimited body") };
        let mut decoder = LengthDecoder::with_buffer(length, input);
        handler.consume_content(&mut decoder, connection.as_ref()).unwrap();
        assert!(decoder.is_completed());
        handler.response_completed().unwrap();

        assert_eq!(context.response().unwrap().status(), StatusCode::OK);
        let response = future.get().unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(&response.body()[..], b"pong");
    }
}
