use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use bytes::Bytes;
use hyper::body::{Body, Frame, Incoming, SizeHint};
use log::{error, info, warn};

/// Pass-through wrapper around the upstream response body that logs the
/// per-request elapsed time once the last byte has been relayed to the
/// caller, or when the stream dies first.
pub struct CompletionTimer {
    inner: Incoming,
    request_id: u128,
    started: Instant,
    logged: bool,
}

impl CompletionTimer {
    pub fn new(inner: Incoming, request_id: u128, started: Instant) -> Self {
        Self {
            inner,
            request_id,
            started,
            logged: false,
        }
    }

    fn completed(&mut self) {
        if !self.logged {
            self.logged = true;
            info!(
                "[REQ-{}] Request completed in {:?}",
                self.request_id,
                self.started.elapsed()
            );
        }
    }

    fn failed(&mut self, cause: &str) {
        if !self.logged {
            self.logged = true;
            error!(
                "[REQ-{}] Response stream failed after {:?}: {cause}",
                self.request_id,
                self.started.elapsed()
            );
        }
    }
}

impl Body for CompletionTimer {
    type Data = Bytes;
    type Error = hyper::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let poll = Pin::new(&mut this.inner).poll_frame(cx);

        match &poll {
            Poll::Ready(None) => this.completed(),
            Poll::Ready(Some(Err(err))) => {
                let cause = err.to_string();
                this.failed(&cause);
            }
            _ => {}
        }

        poll
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl Drop for CompletionTimer {
    fn drop(&mut self) {
        if self.logged {
            return;
        }

        // With a known content length hyper can stop polling after the final
        // frame; the stream still completed. Anything else dropped mid-body
        // means the caller went away.
        if self.inner.is_end_stream() {
            self.completed();
        } else {
            self.logged = true;
            warn!(
                "[REQ-{}] Request abandoned after {:?} (caller disconnected)",
                self.request_id,
                self.started.elapsed()
            );
        }
    }
}
