//! Response body wrapper.
//!
//! # Responsibilities
//! - Forward every body capability to the wrapped body untouched
//! - Feed data frames into the request's status tracker
//! - Finalize the span when the body ends, fails, or is dropped
//!
//! # Design Decisions
//! - Same `Data` and `Error` types as the inner body; frames are never copied
//! - A body without a guard is a plain passthrough (filtered-out requests)

use std::pin::Pin;
use std::task::{ready, Context, Poll};

use http_body::{Body, Frame, SizeHint};
use pin_project_lite::pin_project;

use crate::middleware::span::SpanGuard;

pin_project! {
    /// Response body returned by [`TracingService`](crate::TracingService).
    #[derive(Debug)]
    pub struct TracedBody<B> {
        #[pin]
        inner: B,
        guard: Option<SpanGuard>,
    }
}

impl<B> TracedBody<B> {
    pub(crate) fn new(inner: B, guard: Option<SpanGuard>) -> Self {
        Self { inner, guard }
    }

    pub(crate) fn passthrough(inner: B) -> Self {
        Self::new(inner, None)
    }
}

impl<B> Body for TracedBody<B>
where
    B: Body,
{
    type Data = B::Data;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let mut this = self.project();
        let frame = ready!(this.inner.as_mut().poll_frame(cx));

        match &frame {
            Some(Ok(frame)) => {
                if frame.is_data() {
                    if let Some(guard) = this.guard.as_mut() {
                        guard.record_write();
                    }
                }
                if this.inner.is_end_stream() {
                    if let Some(mut guard) = this.guard.take() {
                        guard.finish();
                    }
                }
            }
            Some(Err(_)) => {
                if let Some(mut guard) = this.guard.take() {
                    tracing::warn!("Response body failed");
                    guard.fail_stream();
                    guard.finish();
                }
            }
            None => {
                if let Some(mut guard) = this.guard.take() {
                    guard.finish();
                }
            }
        }

        Poll::Ready(frame)
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http_body_util::{BodyExt, Full};

    #[tokio::test]
    async fn test_passthrough_forwards_frames() {
        let body = TracedBody::passthrough(Full::new(Bytes::from_static(b"hello")));
        assert_eq!(body.size_hint().exact(), Some(5));
        assert!(!body.is_end_stream());

        let collected = body.collect().await.unwrap().to_bytes();
        assert_eq!(&collected[..], b"hello");
    }

    #[tokio::test]
    async fn test_empty_body_is_end_stream() {
        let body = TracedBody::passthrough(Full::new(Bytes::new()));
        assert!(body.is_end_stream());
        assert_eq!(body.size_hint().exact(), Some(0));
    }

    #[test]
    fn test_debug_output_names_body() {
        let body = TracedBody::passthrough(Full::new(Bytes::from_static(b"hello")));
        let response = http::Response::new(body);
        let rendered = format!("{response:?}");
        assert!(rendered.contains("TracedBody"));
        assert!(rendered.contains("guard: None"));
    }
}
