use axum::{http::StatusCode, routing::get, Router};

use crate::AppState;

pub mod health;
pub mod whoami;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/v1/whoami", get(whoami::whoami))
        .fallback(not_found)
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}
