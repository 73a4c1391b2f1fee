//! Request tracing middleware.
//!
//! # Data Flow
//! ```text
//! inbound request
//!     → service.rs (span filter; skipped requests go straight to the handler)
//!     → span.rs (extract parent, start server span, decorate, start hook)
//!     → handler (runs with the working context attached)
//!     → status.rs (first status wins; unset if nothing was produced)
//!     → body.rs (streams the response, finalizes the span at the end)
//! ```
//!
//! # Design Decisions
//! - Settings are resolved once per middleware instance and never mutated
//! - One span per traced request, ended exactly once on every exit path
//! - The handler's status, headers and bytes are never altered

pub mod body;
pub mod options;
pub mod service;
pub mod span;
pub mod status;

pub use body::TracedBody;
pub use options::{MiddlewareOption, Settings, DEFAULT_COMPONENT_NAME};
pub use service::{middleware, request_context, ResponseFuture, TracingLayer, TracingService};
pub use status::StatusTracker;
