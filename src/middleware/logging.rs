use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{Request, State},
    http,
    middleware::{self as axum_middleware, Next},
    response::Response,
    Router,
};

use super::body::LoggedBody;
use super::context::{with_context_logger, CORRELATION_ID_FIELD, FIELDS_FIELD};
use super::correlation::{ensure_correlation_id, IdGenerator, UuidGenerator};
use super::fields::{RequestFields, RequestSnapshot};
use super::response::{InstrumentedSink, ResponseSink, SinkState};
use crate::logger::Logger;

/// A synchronous request handler writing to a [`ResponseSink`].
pub trait Handler<B>: Send + Sync {
    fn serve(&self, sink: &mut dyn ResponseSink, req: &mut http::Request<B>);
}

impl<B, F> Handler<B> for F
where
    F: Fn(&mut dyn ResponseSink, &mut http::Request<B>) + Send + Sync,
{
    fn serve(&self, sink: &mut dyn ResponseSink, req: &mut http::Request<B>) {
        self(sink, req)
    }
}

/// Per-request logging settings shared by every request task.
#[derive(Clone)]
pub struct RequestLogging {
    logger: Logger,
    exclude: HashSet<String>,
    ids: Arc<dyn IdGenerator>,
}

impl RequestLogging {
    pub fn new(logger: Logger) -> Self {
        Self {
            logger,
            exclude: HashSet::new(),
            ids: Arc::new(UuidGenerator),
        }
    }

    /// Paths, matched exactly, that are served without a completion record.
    pub fn exclude<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.exclude.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn with_id_generator<G: IdGenerator + 'static>(mut self, ids: G) -> Self {
        self.ids = Arc::new(ids);
        self
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        self.exclude.contains(path)
    }

    /// Prepares `req` for instrumented handling. Returns `None` for excluded
    /// paths, leaving the request untouched.
    pub fn begin<B>(&self, req: &mut http::Request<B>) -> Option<InFlight> {
        if self.is_excluded(req.uri().path()) {
            return None;
        }

        let start = Instant::now();
        let correlation_id = ensure_correlation_id(req, self.ids.as_ref());
        let request = with_context_logger(req, &self.logger);

        Some(InFlight {
            start,
            correlation_id,
            request,
        })
    }

    pub fn wrap<H>(self, handler: H) -> WithLogger<H> {
        WithLogger {
            handler,
            logging: self,
        }
    }
}

impl fmt::Debug for RequestLogging {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestLogging")
            .field("logger", &self.logger)
            .field("exclude", &self.exclude)
            .finish_non_exhaustive()
    }
}

/// A request between [`RequestLogging::begin`] and its completion record.
#[derive(Debug)]
pub struct InFlight {
    start: Instant,
    correlation_id: String,
    request: RequestSnapshot,
}

impl InFlight {
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Emits the completion record. Consumes `self`, so a request is logged
    /// at most once.
    pub fn finish(self, logger: &Logger, sink: SinkState) {
        let fields = RequestFields::completion(&self.request, &sink, self.start.elapsed());
        logger
            .info()
            .field(CORRELATION_ID_FIELD, self.correlation_id)
            .object(FIELDS_FIELD, &fields)
            .msg("");
    }
}

/// Builds the logging wrapper around `handler`, skipping `exclude` paths.
pub fn with_logger<H, I, P>(handler: H, logger: Logger, exclude: I) -> WithLogger<H>
where
    I: IntoIterator<Item = P>,
    P: Into<String>,
{
    RequestLogging::new(logger).exclude(exclude).wrap(handler)
}

/// A [`Handler`] that logs one completion record per non-excluded request.
#[derive(Debug)]
pub struct WithLogger<H> {
    handler: H,
    logging: RequestLogging,
}

impl<H> WithLogger<H> {
    pub fn logging(&self) -> &RequestLogging {
        &self.logging
    }
}

impl<B, H: Handler<B>> Handler<B> for WithLogger<H> {
    fn serve(&self, sink: &mut dyn ResponseSink, req: &mut http::Request<B>) {
        let Some(in_flight) = self.logging.begin(req) else {
            self.handler.serve(sink, req);
            return;
        };

        let mut sink = InstrumentedSink::new(sink);
        self.handler.serve(&mut sink, req);
        let state = sink.complete();

        in_flight.finish(&self.logging.logger, state);
    }
}

/// axum middleware running the same pipeline around the inner service.
///
/// The response head is returned as soon as the inner service produces it.
/// Its body is wrapped in a [`LoggedBody`] that counts the bytes actually
/// streamed and writes the record when the body ends.
pub async fn log_requests(
    State(logging): State<Arc<RequestLogging>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(in_flight) = logging.begin(&mut request) else {
        return next.run(request).await;
    };

    let (parts, body) = next.run(request).await.into_parts();
    let body = LoggedBody::new(body, parts.status, in_flight, logging.logger().clone());
    Response::from_parts(parts, Body::new(body))
}

/// Layers [`log_requests`] onto every route of `router`.
pub fn instrument<S>(router: Router<S>, logging: RequestLogging) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(axum_middleware::from_fn_with_state(
        Arc::new(logging),
        log_requests,
    ))
}
