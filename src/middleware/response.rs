use std::io;

use axum::{
    body::Body,
    http::{HeaderMap, StatusCode},
    response::Response,
};

/// The handler-facing response surface.
pub trait ResponseSink {
    fn set_status(&mut self, status: StatusCode);

    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    fn headers_mut(&mut self) -> &mut HeaderMap;
}

impl<S: ResponseSink + ?Sized> ResponseSink for &mut S {
    fn set_status(&mut self, status: StatusCode) {
        (**self).set_status(status)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (**self).write(buf)
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        (**self).headers_mut()
    }
}

/// What an [`InstrumentedSink`] observed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkState {
    pub status: Option<StatusCode>,
    pub written: u64,
}

impl SinkState {
    /// Numeric status, `0` while unset.
    pub fn status_code(&self) -> u16 {
        self.status.map_or(0, |status| status.as_u16())
    }

    /// Keeps the first status seen.
    pub(crate) fn observe_status(&mut self, status: StatusCode) {
        if self.status.is_none() {
            self.status = Some(status);
        }
    }

    /// Counts `len` body bytes; sending a body commits `200 OK` if no status
    /// was set.
    pub(crate) fn observe_write(&mut self, len: usize) {
        self.observe_status(StatusCode::OK);
        self.written += len as u64;
    }
}

/// Records the first status and the byte count while forwarding every call
/// unchanged to the wrapped sink.
#[derive(Debug)]
pub struct InstrumentedSink<W> {
    inner: W,
    state: SinkState,
}

impl<W: ResponseSink> InstrumentedSink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            state: SinkState::default(),
        }
    }

    pub fn state(&self) -> SinkState {
        self.state
    }

    /// Finishes the response the way a transport does when the handler
    /// returns without having sent anything: an implicit `200 OK`.
    pub fn complete(&mut self) -> SinkState {
        if self.state.status.is_none() {
            self.set_status(StatusCode::OK);
        }
        self.state
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: ResponseSink> ResponseSink for InstrumentedSink<W> {
    fn set_status(&mut self, status: StatusCode) {
        self.state.observe_status(status);
        self.inner.set_status(status);
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.state.observe_write(buf.len());
        self.inner.write(buf)
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }
}

/// In-memory transport: buffers what the handler sends and turns it into an
/// axum [`Response`].
///
/// Follows HTTP rules: the first status wins and writing the body without one
/// commits `200 OK`.
#[derive(Debug, Default)]
pub struct ResponseRecorder {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl ResponseRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = self.headers;
        response
    }
}

impl ResponseSink for ResponseRecorder {
    fn set_status(&mut self, status: StatusCode) {
        match self.status {
            None => self.status = Some(status),
            Some(current) => {
                tracing::debug!(%current, ignored = %status, "superfluous set_status call");
            }
        }
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }
}
