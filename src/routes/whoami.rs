use axum::response::Json;
use serde::{Deserialize, Serialize};

use crate::middleware::{CorrelationId, RequestLog};

#[derive(Debug, Serialize, Deserialize)]
pub struct WhoAmIResponse {
    pub correlation_id: String,
}

/// Echoes the request's correlation ID, logging through the request-scoped
/// logger.
pub async fn whoami(id: CorrelationId, RequestLog(log): RequestLog) -> Json<WhoAmIResponse> {
    log.debug().msg("whoami requested");

    Json(WhoAmIResponse {
        correlation_id: id.0,
    })
}
