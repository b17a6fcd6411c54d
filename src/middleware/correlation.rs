use std::convert::Infallible;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, Extensions, HeaderMap, HeaderName, HeaderValue, Request},
};
use uuid::Uuid;

pub static X_CORRELATION_ID: HeaderName = HeaderName::from_static("x-correlation-id");

/// Correlation ID stored in the request extensions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(pub String);

impl CorrelationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Extracts the resolved correlation ID; empty when the request has none.
#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CorrelationId {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(resolve(&parts.headers, &parts.extensions)))
    }
}

/// Source of fresh correlation IDs.
pub trait IdGenerator: Send + Sync {
    fn new_id(&self) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn new_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

impl<F> IdGenerator for F
where
    F: Fn() -> String + Send + Sync,
{
    fn new_id(&self) -> String {
        self()
    }
}

/// Resolves the correlation ID of `req` without generating one.
///
/// The `X-Correlation-ID` header wins, then a [`CorrelationId`] extension.
/// Returns an empty string when neither carries a non-empty value.
pub fn correlation_id<B>(req: &Request<B>) -> String {
    resolve(req.headers(), req.extensions())
}

fn resolve(headers: &HeaderMap, extensions: &Extensions) -> String {
    let from_header = headers
        .get(&X_CORRELATION_ID)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty());
    if let Some(id) = from_header {
        return id.to_string();
    }

    extensions
        .get::<CorrelationId>()
        .map(CorrelationId::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_default()
}

/// Resolves the correlation ID, minting one with `ids` when the request has
/// none. A minted ID is written to both the extensions and the header so
/// later lookups on this request agree.
pub fn ensure_correlation_id<B>(req: &mut Request<B>, ids: &dyn IdGenerator) -> String {
    let id = correlation_id(req);
    if !id.is_empty() {
        return id;
    }

    let id = ids.new_id();
    tracing::debug!(correlation_id = %id, "minted correlation id");
    req.extensions_mut().insert(CorrelationId(id.clone()));
    match HeaderValue::from_str(&id) {
        Ok(value) => {
            req.headers_mut().insert(X_CORRELATION_ID.clone(), value);
        }
        Err(_) => {
            tracing::warn!(correlation_id = %id, "correlation id is not a valid header value");
        }
    }
    id
}
