use std::pin::Pin;
use std::task::{Context, Poll};

use axum::{
    body::{Body, Bytes},
    http::StatusCode,
};
use http_body::{Body as _, Frame, SizeHint};

use super::logging::InFlight;
use super::response::SinkState;
use crate::logger::Logger;

/// Response body that counts the bytes of every data frame it yields and
/// emits the completion record once, when the stream ends, fails or is
/// dropped by the transport.
///
/// Frames and errors are passed through untouched.
pub struct LoggedBody {
    inner: Body,
    state: SinkState,
    pending: Option<(InFlight, Logger)>,
}

impl LoggedBody {
    pub(crate) fn new(inner: Body, status: StatusCode, in_flight: InFlight, logger: Logger) -> Self {
        let mut state = SinkState::default();
        state.observe_status(status);

        let mut body = Self {
            inner,
            state,
            pending: Some((in_flight, logger)),
        };
        // Transports may never poll a body that is already complete.
        if body.inner.is_end_stream() {
            body.finish();
        }
        body
    }

    pub fn state(&self) -> SinkState {
        self.state
    }

    fn finish(&mut self) {
        if let Some((in_flight, logger)) = self.pending.take() {
            in_flight.finish(&logger, self.state);
        }
    }
}

impl http_body::Body for LoggedBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = &mut *self;
        let polled = Pin::new(&mut this.inner).poll_frame(cx);

        match &polled {
            Poll::Ready(Some(Ok(frame))) => {
                if let Some(data) = frame.data_ref() {
                    this.state.observe_write(data.len());
                }
                if this.inner.is_end_stream() {
                    this.finish();
                }
            }
            Poll::Ready(Some(Err(e))) => {
                if let Some((in_flight, _)) = &this.pending {
                    tracing::warn!(
                        correlation_id = in_flight.correlation_id(),
                        error = %e,
                        sent = this.state.written,
                        "response body failed mid-stream"
                    );
                }
                this.finish();
            }
            Poll::Ready(None) => this.finish(),
            Poll::Pending => {}
        }

        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl Drop for LoggedBody {
    fn drop(&mut self) {
        self.finish();
    }
}
