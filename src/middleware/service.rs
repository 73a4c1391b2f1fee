//! Tower layer and service that trace inbound requests.
//!
//! # Responsibilities
//! - Decide per request whether to trace (span filter)
//! - Start the server span and expose it to the handler
//! - Record the response status and hand the span to the response body
//! - Finalize the span on errors, panics and cancellation
//!
//! # Design Decisions
//! - Handler errors and panics are passed through unchanged, after the span ends
//! - The working context is attached only while this request's future is polled
//! - Filtered-out requests take no tracing path beyond the filter itself

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{self, ready, Poll};

use http::{Request, Response};
use opentelemetry::trace::Tracer;
use opentelemetry::Context;
use pin_project_lite::pin_project;
use tower::{Layer, Service};

use crate::middleware::body::TracedBody;
use crate::middleware::options::{MiddlewareOption, Settings};
use crate::middleware::span::SpanGuard;

/// Wrap `service` so every request it handles runs inside a server span.
///
/// # Example
/// ```no_run
/// use std::convert::Infallible;
///
/// use http::{Request, Response};
/// use http_span_middleware::{middleware, options};
/// use opentelemetry::trace::TracerProvider as _;
/// use opentelemetry_sdk::trace::SdkTracerProvider;
/// use tower::service_fn;
///
/// let provider = SdkTracerProvider::builder().build();
/// let handler = service_fn(|_: Request<String>| async {
///     Ok::<_, Infallible>(Response::new(String::from("OK")))
/// });
///
/// let traced = middleware(provider.tracer("orders-api"), handler, [
///     options::operation_name(|parts| format!("HTTP {} {}", parts.method, parts.uri.path())),
///     options::url_tag(|uri| uri.path().to_string()),
/// ]);
/// # drop(traced);
/// ```
pub fn middleware<S, T, I>(tracer: T, service: S, options: I) -> TracingService<S, T>
where
    I: IntoIterator<Item = MiddlewareOption>,
{
    TracingLayer::new(tracer, options).into_service(service)
}

/// The working context of a traced request, as seen by the handler.
///
/// Returns `None` for requests that did not pass the span filter.
pub fn request_context<B>(request: &Request<B>) -> Option<&Context> {
    request.extensions().get::<Context>()
}

/// [`Layer`] applying [`TracingService`] to a service.
#[derive(Clone)]
pub struct TracingLayer<T> {
    tracer: T,
    settings: Arc<Settings>,
}

impl<T> TracingLayer<T> {
    pub fn new<I>(tracer: T, options: I) -> Self
    where
        I: IntoIterator<Item = MiddlewareOption>,
    {
        Self {
            tracer,
            settings: Arc::new(Settings::resolve(options)),
        }
    }

    /// The settings every request through this layer is traced with.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn into_service<S>(self, inner: S) -> TracingService<S, T> {
        TracingService {
            inner,
            tracer: self.tracer,
            settings: self.settings,
        }
    }
}

impl<S, T: Clone> Layer<S> for TracingLayer<T> {
    type Service = TracingService<S, T>;

    fn layer(&self, inner: S) -> Self::Service {
        self.clone().into_service(inner)
    }
}

/// Service wrapping each request of `S` in a server span.
#[derive(Clone)]
pub struct TracingService<S, T> {
    inner: S,
    tracer: T,
    settings: Arc<Settings>,
}

impl<S, T, ReqBody, ResBody> Service<Request<ReqBody>> for TracingService<S, T>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    T: Tracer,
    T::Span: Send + Sync + 'static,
{
    type Response = Response<TracedBody<ResBody>>;
    type Error = S::Error;
    type Future = ResponseFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        let (mut parts, body) = request.into_parts();

        if !self.settings.should_trace(&parts) {
            tracing::debug!(
                method = %parts.method,
                uri = %parts.uri,
                "Request skipped by span filter"
            );
            return ResponseFuture {
                inner: self.inner.call(Request::from_parts(parts, body)),
                guard: None,
            };
        }

        let guard = SpanGuard::start(&self.tracer, Arc::clone(&self.settings), &parts);
        parts.extensions.insert(guard.context().clone());

        let inner = {
            let _attached = guard.context().clone().attach();
            self.inner.call(Request::from_parts(parts, body))
        };

        ResponseFuture {
            inner,
            guard: Some(guard),
        }
    }
}

pin_project! {
    /// Response future of [`TracingService`].
    #[derive(Debug)]
    pub struct ResponseFuture<F> {
        #[pin]
        inner: F,
        guard: Option<SpanGuard>,
    }
}

impl<F, B, E> Future for ResponseFuture<F>
where
    F: Future<Output = Result<Response<B>, E>>,
{
    type Output = Result<Response<TracedBody<B>>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut task::Context<'_>) -> Poll<Self::Output> {
        let mut this = self.project();

        let Some(guard) = this.guard.as_mut() else {
            let result = ready!(this.inner.poll(cx));
            return Poll::Ready(result.map(|response| response.map(TracedBody::passthrough)));
        };

        let polled = {
            let _attached = guard.context().clone().attach();
            panic::catch_unwind(AssertUnwindSafe(|| this.inner.as_mut().poll(cx)))
        };

        match polled {
            Ok(Poll::Pending) => Poll::Pending,
            Ok(Poll::Ready(Ok(response))) => {
                guard.record_header(response.status());
                let guard = this.guard.take();
                Poll::Ready(Ok(response.map(|body| TracedBody::new(body, guard))))
            }
            Ok(Poll::Ready(Err(err))) => {
                tracing::warn!("Inner service failed before producing a response");
                guard.finish();
                Poll::Ready(Err(err))
            }
            Err(payload) => {
                tracing::warn!("Handler panicked, span finished before unwinding");
                guard.finish();
                panic::resume_unwind(payload)
            }
        }
    }
}
