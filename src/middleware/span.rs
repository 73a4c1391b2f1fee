//! Server span lifecycle.
//!
//! # Responsibilities
//! - Extract the inbound trace context from request headers
//! - Start the server span and set the request-side tags
//! - Run the decoration and start hooks
//! - Finalize the span exactly once, whichever way the request ends
//!
//! # Design Decisions
//! - Extraction never fails the request; no valid remote parent means a root span
//! - [`SpanGuard`] finalizes on explicit `finish` or, failing that, on drop
//! - The span itself is held in the request context so handlers can extend it

use std::sync::Arc;

use http::request::Parts;
use http::{Request, StatusCode};
use opentelemetry::trace::{SpanKind, Status, TraceContextExt, Tracer};
use opentelemetry::{global, Context, KeyValue};
use opentelemetry_http::HeaderExtractor;

use crate::middleware::options::Settings;
use crate::middleware::status::StatusTracker;

pub const HTTP_METHOD: &str = "http.method";
pub const HTTP_URL: &str = "http.url";
pub const HTTP_STATUS_CODE: &str = "http.status_code";
pub const COMPONENT: &str = "component";
pub const ERROR: &str = "error";

/// Extract the remote parent carried by the request headers.
///
/// Missing or malformed headers yield an empty context, so the span becomes
/// a trace root.
pub(crate) fn extract_parent(settings: &Settings, parts: &Parts) -> Context {
    let extractor = HeaderExtractor(&parts.headers);
    let extracted = match &settings.propagator {
        Some(propagator) => propagator.extract_with_context(&Context::new(), &extractor),
        None => global::get_text_map_propagator(|propagator| {
            propagator.extract_with_context(&Context::new(), &extractor)
        }),
    };

    if extracted.span().span_context().is_valid() {
        extracted
    } else {
        Context::new()
    }
}

/// Owns one request's server span until it has been finalized.
#[derive(Debug)]
pub(crate) struct SpanGuard {
    /// Context holding the span this guard must end.
    span_cx: Context,
    /// Working context produced by the start hook.
    cx: Context,
    head: Parts,
    settings: Arc<Settings>,
    tracker: StatusTracker,
    stream_failed: bool,
    finished: bool,
}

impl SpanGuard {
    pub(crate) fn start<T>(tracer: &T, settings: Arc<Settings>, parts: &Parts) -> Self
    where
        T: Tracer,
        T::Span: Send + Sync + 'static,
    {
        let parent = extract_parent(&settings, parts);
        let remote_parent = parent.has_active_span();
        let name = settings.operation_name(parts);

        let span = tracer
            .span_builder(name.clone())
            .with_kind(SpanKind::Server)
            .start_with_context(tracer, &parent);
        let span_cx = Context::current_with_span(span);

        {
            let span = span_cx.span();
            span.set_attribute(KeyValue::new(HTTP_METHOD, parts.method.to_string()));
            span.set_attribute(KeyValue::new(HTTP_URL, settings.url_tag(&parts.uri)));
            (settings.span_observer)(&span, parts);
        }

        let cx = (settings.on_span_start)(&span_cx, parts);
        span_cx.span().set_attribute(KeyValue::new(
            COMPONENT,
            settings.component_name().to_string(),
        ));

        tracing::debug!(operation = %name, remote_parent, "Server span started");

        Self {
            span_cx,
            cx,
            head: snapshot(parts),
            settings,
            tracker: StatusTracker::new(),
            stream_failed: false,
            finished: false,
        }
    }

    /// The working context the handler runs under.
    pub(crate) fn context(&self) -> &Context {
        &self.cx
    }

    pub(crate) fn record_header(&mut self, code: StatusCode) {
        self.tracker.record_header(code);
    }

    pub(crate) fn record_write(&mut self) {
        self.tracker.record_write();
    }

    /// Mark the response as broken after its head was sent.
    pub(crate) fn fail_stream(&mut self) {
        self.stream_failed = true;
    }

    /// Tag and end the span. Only the first call has any effect.
    pub(crate) fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;

        let span = self.span_cx.span();
        let status = self.tracker.current_status();
        let code = status.map_or(0, |code| i64::from(code.as_u16()));
        span.set_attribute(KeyValue::new(HTTP_STATUS_CODE, code));

        let failed = self.tracker.is_failure() || self.stream_failed;
        if failed {
            span.set_attribute(KeyValue::new(ERROR, true));
            let description = match status {
                None => "no response produced".to_string(),
                Some(_) if self.stream_failed => "response body failed".to_string(),
                Some(code) => format!("server error {}", code.as_u16()),
            };
            span.set_status(Status::error(description));
        }

        let _ = (self.settings.on_span_finish)(&self.cx, &self.head);
        span.end();

        tracing::debug!(
            status = code,
            header_written = self.tracker.header_written(),
            error = failed,
            "Server span finished"
        );
    }
}

impl Drop for SpanGuard {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if self.tracker.current_status().is_none() {
            tracing::warn!(
                method = %self.head.method,
                uri = %self.head.uri,
                "Request dropped before a response was produced"
            );
        }
        self.finish();
    }
}

/// Copy of the request head kept for the finish hook.
///
/// Extensions are not carried over; the handler owns the original request.
fn snapshot(parts: &Parts) -> Parts {
    let (mut head, ()) = Request::new(()).into_parts();
    head.method = parts.method.clone();
    head.uri = parts.uri.clone();
    head.version = parts.version;
    head.headers = parts.headers.clone();
    head
}
