use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    extract::ConnectInfo,
    http::{header, Request},
};
use serde::{Serialize, Serializer};

use super::response::SinkState;

/// The request attributes that end up in a log record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestSnapshot {
    pub remote_addr: String,
    pub method: String,
    pub request: String,
    pub user_agent: String,
    pub referrer: String,
}

impl<B> From<&Request<B>> for RequestSnapshot {
    fn from(req: &Request<B>) -> Self {
        let header_str = |name: header::HeaderName| {
            req.headers()
                .get(name)
                .and_then(|value| value.to_str().ok())
                .unwrap_or_default()
                .to_string()
        };

        Self {
            remote_addr: req
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.to_string())
                .unwrap_or_default(),
            method: req.method().to_string(),
            request: req.uri().to_string(),
            user_agent: header_str(header::USER_AGENT),
            referrer: header_str(header::REFERER),
        }
    }
}

/// One logged event, serialized under `@fields`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RequestFields {
    pub remote_addr: String,
    pub request: String,
    #[serde(serialize_with = "fractional_seconds")]
    pub request_time: Duration,
    pub body_bytes_sent: u64,
    pub status: u16,
    #[serde(rename = "request_method")]
    pub method: String,
    #[serde(rename = "http_referrer")]
    pub referrer: String,
    #[serde(rename = "http_user_agent")]
    pub user_agent: String,
}

impl RequestFields {
    /// Projection bound to the request-scoped logger when handling starts.
    pub fn entry(req: &RequestSnapshot) -> Self {
        Self {
            remote_addr: req.remote_addr.clone(),
            method: req.method.clone(),
            request: req.request.clone(),
            ..Self::default()
        }
    }

    /// Projection for the completion record.
    pub fn completion(req: &RequestSnapshot, sink: &SinkState, elapsed: Duration) -> Self {
        Self {
            remote_addr: req.remote_addr.clone(),
            request: req.request.clone(),
            request_time: elapsed,
            body_bytes_sent: sink.written,
            status: sink.status_code(),
            method: req.method.clone(),
            referrer: req.referrer.clone(),
            user_agent: req.user_agent.clone(),
        }
    }
}

fn fractional_seconds<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(elapsed.as_secs_f64())
}
