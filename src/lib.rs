use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{extract::FromRef, Router};
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tracing::info;

pub mod config;
pub mod error;
pub mod logger;
pub mod middleware;
pub mod routes;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Error, Result};
pub use logger::Logger;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::AppConfig>,
    pub logger: Logger,
}

impl FromRef<AppState> for Logger {
    fn from_ref(state: &AppState) -> Self {
        state.logger.clone()
    }
}

/// Builds the service router with request logging on every route.
pub fn create_app(state: AppState) -> Router {
    let logging = middleware::RequestLogging::new(state.logger.clone())
        .exclude(state.config.logging.exclude.iter().cloned());
    let timeout = Duration::from_secs(state.config.server.timeout_seconds);

    let app = routes::router().layer(TimeoutLayer::new(timeout));
    middleware::instrument(app, logging).with_state(state)
}

/// Binds the configured address and serves `app` with peer addresses
/// available to the request logger.
pub async fn serve(config: &config::AppConfig, app: Router) -> Result<()> {
    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr).await?;

    info!(
        %addr,
        excluded = ?config.logging.exclude,
        "request-logger listening"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
