use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use request_logger::{
    config::{AppConfig, LogFormat},
    create_app, logger,
    logger::{Logger, TracingSink},
    serve, AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    init_tracing(config.logging.format);
    info!("Configuration loaded successfully");

    let logger = build_logger(&config);
    let state = AppState {
        config: Arc::new(config.clone()),
        logger,
    };

    serve(&config, create_app(state)).await?;

    Ok(())
}

fn build_logger(config: &AppConfig) -> Logger {
    let settings = &config.logging;
    match settings.format {
        LogFormat::Json => logger::init(&settings.app_name, settings.debug),
        LogFormat::Tracing => {
            Logger::new(TracingSink).configure(&settings.app_name, settings.debug)
        }
    }
}

/// Diagnostics follow the request record format: JSON lines next to JSON
/// records, the plain formatter when records go through `tracing`.
fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => subscriber
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Tracing => subscriber.with(tracing_subscriber::fmt::layer()).init(),
    }
}
