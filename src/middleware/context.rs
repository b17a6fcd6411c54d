use std::convert::Infallible;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, Extensions, Request},
};

use super::correlation::correlation_id;
use super::fields::{RequestFields, RequestSnapshot};
use crate::logger::Logger;

pub const CORRELATION_ID_FIELD: &str = "correlation_id";
pub const FIELDS_FIELD: &str = "@fields";

// Only this module inserts it, so a `Logger` stored by other code is never
// mistaken for the request logger.
#[derive(Clone)]
struct ScopedLogger(Logger);

/// Binds a child of `base` carrying the request's correlation ID and entry
/// fields to the request extensions. Does not mint an ID.
///
/// Returns the snapshot the entry fields were taken from.
pub fn with_context_logger<B>(req: &mut Request<B>, base: &Logger) -> RequestSnapshot {
    let snapshot = RequestSnapshot::from(&*req);
    let logger = base
        .with_field(CORRELATION_ID_FIELD, correlation_id(req))
        .with_object(FIELDS_FIELD, &RequestFields::entry(&snapshot));
    req.extensions_mut().insert(ScopedLogger(logger));
    snapshot
}

/// The logger bound by [`with_context_logger`], or `default`.
pub fn from_request<B>(req: &Request<B>, default: &Logger) -> Logger {
    from_extensions(req.extensions(), default)
}

pub fn from_extensions(extensions: &Extensions, default: &Logger) -> Logger {
    extensions
        .get::<ScopedLogger>()
        .map(|ScopedLogger(logger)| logger.clone())
        .unwrap_or_else(|| default.clone())
}

/// Extracts the request-scoped logger, falling back to the state's logger.
///
/// ```ignore
/// async fn handler(RequestLog(log): RequestLog) -> &'static str {
///     log.info().msg("charging card");
///     "ok"
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequestLog(pub Logger);

#[async_trait]
impl<S> FromRequestParts<S> for RequestLog
where
    Logger: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(from_extensions(&parts.extensions, &Logger::from_ref(state))))
    }
}
