use std::io::Write;
use std::sync::Mutex;

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use tracing::Level;

use super::{LEVEL_FIELD, MESSAGE_FIELD, TIMESTAMP_FIELD};

/// Destination for finished log records.
///
/// `fields` already contains the logger's bound context merged with the
/// event's own fields. Emission is fire-and-forget: implementations report
/// their own failures and never block the caller on retries.
pub trait LogSink: Send + Sync {
    fn record(&self, fields: &Map<String, Value>, level: Option<Level>, message: &str);
}

/// Writes one JSON object per line.
pub struct JsonSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    fn encode(fields: &Map<String, Value>, level: Option<Level>, message: &str) -> Vec<u8> {
        let mut record = Map::with_capacity(fields.len() + 3);
        record.insert(
            TIMESTAMP_FIELD.to_string(),
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        if let Some(level) = level {
            record.insert(LEVEL_FIELD.to_string(), Value::String(level_name(level)));
        }
        for (key, value) in fields {
            record.insert(key.clone(), value.clone());
        }
        record.insert(MESSAGE_FIELD.to_string(), Value::String(message.to_string()));

        let mut line = serde_json::to_vec(&Value::Object(record)).unwrap_or_default();
        line.push(b'\n');
        line
    }
}

impl<W: Write + Send> LogSink for JsonSink<W> {
    fn record(&self, fields: &Map<String, Value>, level: Option<Level>, message: &str) {
        let line = Self::encode(fields, level, message);

        // One write_all per record keeps concurrent records from interleaving.
        let mut writer = self.writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(e) = writer.write_all(&line).and_then(|_| writer.flush()) {
            tracing::warn!(error = %e, "dropping log record");
        }
    }
}

/// Forwards records into the `tracing` pipeline.
///
/// Useful when the host already installs a `tracing-subscriber` and wants
/// request records to flow through the same formatter and filter.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn record(&self, fields: &Map<String, Value>, level: Option<Level>, message: &str) {
        let record = Value::Object(fields.clone());
        match level.unwrap_or(Level::INFO) {
            l if l == Level::ERROR => {
                tracing::error!(target: "request_logger", record = %record, "{}", message)
            }
            l if l == Level::WARN => {
                tracing::warn!(target: "request_logger", record = %record, "{}", message)
            }
            l if l == Level::INFO => {
                tracing::info!(target: "request_logger", record = %record, "{}", message)
            }
            l if l == Level::DEBUG => {
                tracing::debug!(target: "request_logger", record = %record, "{}", message)
            }
            _ => tracing::trace!(target: "request_logger", record = %record, "{}", message),
        }
    }
}

pub(crate) fn level_name(level: Level) -> String {
    level.as_str().to_ascii_lowercase()
}
