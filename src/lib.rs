//! Server-side request tracing middleware.
//!
//! Wraps any `tower` HTTP service so every inbound request runs inside an
//! OpenTelemetry server span. The span continues the caller's trace when the
//! request carries propagation headers, is reachable from the handler through
//! the request context, and always ends exactly once with the response status
//! and error tags set, even when the handler fails, panics or is cancelled.
//!
//! ```no_run
//! use axum::routing::get;
//! use axum::Router;
//! use http_span_middleware::{options, TracingLayer};
//! use opentelemetry::trace::TracerProvider as _;
//! use opentelemetry_sdk::trace::SdkTracerProvider;
//!
//! let provider = SdkTracerProvider::builder().build();
//! let app: Router = Router::new()
//!     .route("/root", get(|| async { "OK" }))
//!     .layer(TracingLayer::new(provider.tracer("orders-api"), [
//!         options::component_name("orders-api"),
//!         options::span_filter(|parts| parts.uri.path() != "/health"),
//!     ]));
//! # drop(app);
//! ```

pub mod config;
pub mod middleware;

pub use config::TracingConfig;
pub use middleware::options;
pub use middleware::{
    middleware, request_context, MiddlewareOption, ResponseFuture, Settings, StatusTracker,
    TracedBody, TracingLayer, TracingService, DEFAULT_COMPONENT_NAME,
};
pub use middleware::span::{COMPONENT, ERROR, HTTP_METHOD, HTTP_STATUS_CODE, HTTP_URL};
