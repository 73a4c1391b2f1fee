//! Response status tracking.
//!
//! # Responsibilities
//! - Remember the first status code produced for a request
//! - Distinguish an explicit status from the implicit 200 of a bare body write
//! - Report "unset" when the handler never produced anything
//!
//! # Design Decisions
//! - First write wins, like an HTTP response line that can only be sent once
//! - Unset is `None`, never confused with 0 or 200

use http::StatusCode;

/// Per-request record of the response status seen by the middleware.
///
/// The middleware records the response head before any body frame, so the
/// implicit 200 of [`record_write`](Self::record_write) only applies to
/// callers that report writes without a head.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StatusTracker {
    status: Option<StatusCode>,
    header_written: bool,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an explicit status. Ignored once any status has been recorded.
    pub fn record_header(&mut self, code: StatusCode) {
        if self.status.is_none() {
            self.status = Some(code);
            self.header_written = true;
        }
    }

    /// Record a body write. A write without a prior status implies 200.
    pub fn record_write(&mut self) {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
    }

    /// The recorded status, or `None` if nothing was produced.
    pub fn current_status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Whether the recorded status came from [`record_header`](Self::record_header).
    pub fn header_written(&self) -> bool {
        self.header_written
    }

    /// Whether the span for this response must carry the error tag.
    pub fn is_failure(&self) -> bool {
        match self.status {
            Some(code) => code.as_u16() >= 500,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_by_default() {
        let tracker = StatusTracker::new();
        assert_eq!(tracker.current_status(), None);
        assert!(!tracker.header_written());
        assert!(tracker.is_failure());
    }

    #[test]
    fn test_first_header_wins() {
        let mut tracker = StatusTracker::new();
        tracker.record_header(StatusCode::NOT_FOUND);
        tracker.record_header(StatusCode::OK);
        assert_eq!(tracker.current_status(), Some(StatusCode::NOT_FOUND));
        assert!(tracker.header_written());
        assert!(!tracker.is_failure());
    }

    #[test]
    fn test_write_implies_ok() {
        let mut tracker = StatusTracker::new();
        tracker.record_write();
        assert_eq!(tracker.current_status(), Some(StatusCode::OK));
        assert!(!tracker.header_written());
        assert!(!tracker.is_failure());

        // The implicit 200 is already on the wire; a late header changes nothing.
        tracker.record_header(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(tracker.current_status(), Some(StatusCode::OK));
    }

    #[test]
    fn test_write_after_header_keeps_status() {
        let mut tracker = StatusTracker::new();
        tracker.record_header(StatusCode::CREATED);
        tracker.record_write();
        tracker.record_write();
        assert_eq!(tracker.current_status(), Some(StatusCode::CREATED));
        assert!(tracker.header_written());
    }

    #[test]
    fn test_server_errors_are_failures() {
        for code in [500u16, 503, 599] {
            let mut tracker = StatusTracker::new();
            tracker.record_header(StatusCode::from_u16(code).unwrap());
            assert!(tracker.is_failure(), "{code} should be a failure");
        }

        let mut tracker = StatusTracker::new();
        tracker.record_header(StatusCode::from_u16(499).unwrap());
        assert!(!tracker.is_failure());
    }
}
