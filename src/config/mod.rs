use serde::{Deserialize, Serialize};

use crate::error::Result;

const DEFAULT_CONFIG_PATH: &str = "config/default.yaml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Stamped on every record as `@source`.
    pub app_name: String,
    pub debug: bool,
    pub format: LogFormat,
    /// Request paths that never produce a completion record.
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON lines on stdout.
    Json,
    /// Records forwarded to the installed `tracing` subscriber.
    Tracing,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let mut builder = Self::defaults()?
            .add_source(config::File::with_name(&config_path).required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("logging.exclude")
                    .try_parsing(true),
            );

        // Override with environment variables if present
        if let Ok(host) = std::env::var("HOST") {
            builder = builder.set_override("server.host", host)?;
        }
        if let Ok(port) = std::env::var("PORT") {
            builder = builder.set_override("server.port", port)?;
        }

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Parses a YAML document layered over the defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let settings = Self::defaults()?
            .add_source(config::File::from_str(yaml, config::FileFormat::Yaml))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        Ok(config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("server.timeout_seconds", 30)?
            .set_default("logging.app_name", env!("CARGO_PKG_NAME"))?
            .set_default("logging.debug", false)?
            .set_default("logging.format", "json")?
            .set_default("logging.exclude", vec!["/health".to_string()])?)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
