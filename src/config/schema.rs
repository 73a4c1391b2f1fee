//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use http::header::USER_AGENT;
use serde::{Deserialize, Serialize};

use crate::middleware::options::{self, MiddlewareOption};

/// File-level settings for one tracing middleware instance.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct TracingConfig {
    /// Value of the `component` tag. Falls back to the crate name.
    pub component_name: Option<String>,

    /// Path prefixes that are never traced (e.g. "/health").
    pub excluded_paths: Vec<String>,

    /// `User-Agent` prefixes that are never traced (e.g. "kube-probe").
    pub excluded_user_agents: Vec<String>,

    /// Tag `http.url` with the path only, dropping the query string.
    pub redact_query: bool,

    /// Name spans "HTTP {method} {path}" instead of "HTTP {method}".
    pub include_path_in_operation_name: bool,
}

impl TracingConfig {
    /// Expand into middleware options.
    ///
    /// Fields left at their defaults produce no option, so the middleware
    /// defaults apply to them.
    pub fn into_options(self) -> Vec<MiddlewareOption> {
        let mut opts = Vec::new();

        if let Some(name) = self.component_name {
            opts.push(options::component_name(name));
        }

        if !self.excluded_paths.is_empty() || !self.excluded_user_agents.is_empty() {
            let paths = self.excluded_paths;
            let agents = self.excluded_user_agents;
            opts.push(options::span_filter(move |parts| {
                let path = parts.uri.path();
                if paths.iter().any(|prefix| path.starts_with(prefix.as_str())) {
                    return false;
                }
                let agent = parts
                    .headers
                    .get(USER_AGENT)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or_default();
                !agents.iter().any(|prefix| agent.starts_with(prefix.as_str()))
            }));
        }

        if self.redact_query {
            opts.push(options::url_tag(|uri| uri.path().to_string()));
        }

        if self.include_path_in_operation_name {
            opts.push(options::operation_name(|parts| {
                format!("HTTP {} {}", parts.method, parts.uri.path())
            }));
        }

        opts
    }
}
