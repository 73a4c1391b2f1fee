//! Middleware options and the resolved settings bundle.
//!
//! # Responsibilities
//! - Provide one option constructor per tunable behavior
//! - Resolve a list of options over the defaults, in call order
//!
//! # Design Decisions
//! - Options are opaque mutators; later options override earlier ones
//! - The resolved [`Settings`] is immutable and shared through an `Arc`
//! - Every field has a working default, so an empty option list is valid

use std::fmt;

use http::request::Parts;
use http::Uri;
use opentelemetry::propagation::TextMapPropagator;
use opentelemetry::trace::SpanRef;
use opentelemetry::Context;

/// Component tag used when no component name is configured.
pub const DEFAULT_COMPONENT_NAME: &str = env!("CARGO_PKG_NAME");

type OperationNameFn = dyn Fn(&Parts) -> String + Send + Sync;
type SpanFilterFn = dyn Fn(&Parts) -> bool + Send + Sync;
type SpanObserverFn = dyn Fn(&SpanRef<'_>, &Parts) + Send + Sync;
type SpanHookFn = dyn Fn(&Context, &Parts) -> Context + Send + Sync;
type UrlTagFn = dyn Fn(&Uri) -> String + Send + Sync;

/// Resolved behavior of one middleware instance.
pub struct Settings {
    pub(crate) operation_name: Box<OperationNameFn>,
    pub(crate) span_filter: Box<SpanFilterFn>,
    pub(crate) span_observer: Box<SpanObserverFn>,
    pub(crate) on_span_start: Box<SpanHookFn>,
    pub(crate) on_span_finish: Box<SpanHookFn>,
    pub(crate) url_tag: Box<UrlTagFn>,
    pub(crate) component_name: Option<String>,
    pub(crate) propagator: Option<Box<dyn TextMapPropagator + Send + Sync>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            operation_name: Box::new(|parts: &Parts| format!("HTTP {}", parts.method)),
            span_filter: Box::new(|_: &Parts| true),
            span_observer: Box::new(|_: &SpanRef<'_>, _: &Parts| {}),
            on_span_start: Box::new(|cx: &Context, _: &Parts| cx.clone()),
            on_span_finish: Box::new(|cx: &Context, _: &Parts| cx.clone()),
            url_tag: Box::new(|uri: &Uri| uri.to_string()),
            component_name: None,
            propagator: None,
        }
    }
}

impl Settings {
    /// Apply `options` in order over the defaults.
    pub fn resolve<I>(options: I) -> Self
    where
        I: IntoIterator<Item = MiddlewareOption>,
    {
        let mut settings = Self::default();
        for option in options {
            option.apply(&mut settings);
        }
        settings
    }

    /// Component tag value, falling back to [`DEFAULT_COMPONENT_NAME`].
    pub fn component_name(&self) -> &str {
        self.component_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_COMPONENT_NAME)
    }

    pub fn should_trace(&self, parts: &Parts) -> bool {
        (self.span_filter)(parts)
    }

    pub fn operation_name(&self, parts: &Parts) -> String {
        (self.operation_name)(parts)
    }

    pub fn url_tag(&self, uri: &Uri) -> String {
        (self.url_tag)(uri)
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("component_name", &self.component_name())
            .field("propagator", &self.propagator)
            .finish_non_exhaustive()
    }
}

/// A single override applied to [`Settings`] when the middleware is built.
pub struct MiddlewareOption(Box<dyn FnOnce(&mut Settings) + Send>);

impl MiddlewareOption {
    fn new(f: impl FnOnce(&mut Settings) + Send + 'static) -> Self {
        Self(Box::new(f))
    }

    pub(crate) fn apply(self, settings: &mut Settings) {
        (self.0)(settings)
    }
}

impl fmt::Debug for MiddlewareOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MiddlewareOption")
    }
}

/// Name each server span with `f` instead of `"HTTP {method}"`.
pub fn operation_name<F>(f: F) -> MiddlewareOption
where
    F: Fn(&Parts) -> String + Send + Sync + 'static,
{
    MiddlewareOption::new(move |settings| settings.operation_name = Box::new(f))
}

/// Only create spans for requests where `f` returns `true`.
pub fn span_filter<F>(f: F) -> MiddlewareOption
where
    F: Fn(&Parts) -> bool + Send + Sync + 'static,
{
    MiddlewareOption::new(move |settings| settings.span_filter = Box::new(f))
}

/// Decorate every server span right after the standard tags are set.
pub fn span_observer<F>(f: F) -> MiddlewareOption
where
    F: Fn(&SpanRef<'_>, &Parts) + Send + Sync + 'static,
{
    MiddlewareOption::new(move |settings| settings.span_observer = Box::new(f))
}

/// Derive the request's working context once its span has started.
///
/// The returned context is the one the handler runs under and the one
/// handed to the finish hook.
pub fn on_span_start<F>(f: F) -> MiddlewareOption
where
    F: Fn(&Context, &Parts) -> Context + Send + Sync + 'static,
{
    MiddlewareOption::new(move |settings| settings.on_span_start = Box::new(f))
}

/// Observe the span right before it ends.
///
/// Runs on every exit path, including panics and cancellation. The returned
/// context is discarded once the span has ended.
pub fn on_span_finish<F>(f: F) -> MiddlewareOption
where
    F: Fn(&Context, &Parts) -> Context + Send + Sync + 'static,
{
    MiddlewareOption::new(move |settings| settings.on_span_finish = Box::new(f))
}

/// Compute the `http.url` tag with `f`, e.g. to redact query strings.
pub fn url_tag<F>(f: F) -> MiddlewareOption
where
    F: Fn(&Uri) -> String + Send + Sync + 'static,
{
    MiddlewareOption::new(move |settings| settings.url_tag = Box::new(f))
}

/// Set the `component` tag of every server span.
pub fn component_name(name: impl Into<String>) -> MiddlewareOption {
    let name = name.into();
    MiddlewareOption::new(move |settings| settings.component_name = Some(name))
}

/// Extract inbound trace context with `propagator` instead of the global one.
pub fn propagator<P>(propagator: P) -> MiddlewareOption
where
    P: TextMapPropagator + Send + Sync + 'static,
{
    MiddlewareOption::new(move |settings| settings.propagator = Some(Box::new(propagator)))
}
