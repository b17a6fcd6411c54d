//! Structured JSON logger.
//!
//! A [`Logger`] is an immutable value: configuring it (level, destination,
//! bound fields) returns a new logger and never touches the one it was
//! derived from. Clones share the same sink, so one process-wide logger built
//! at startup can be handed to every request task.
//!
//! ```text
//! {"@timestamp":"…","@level":"info","@source":"app","correlation_id":"…","@fields":{…},"@message":""}
//! ```

use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

pub use tracing::Level;

mod sink;

pub use sink::{JsonSink, LogSink, TracingSink};

pub const TIMESTAMP_FIELD: &str = "@timestamp";
pub const LEVEL_FIELD: &str = "@level";
pub const MESSAGE_FIELD: &str = "@message";
pub const SOURCE_FIELD: &str = "@source";

/// Builds the default stdout logger, stamped with `@source = app`.
pub fn init(app: &str, debug: bool) -> Logger {
    Logger::stdout().configure(app, debug)
}

#[derive(Clone)]
pub struct Logger {
    sink: Arc<dyn LogSink>,
    level: Level,
    context: Arc<Map<String, Value>>,
}

impl Logger {
    pub fn new<S: LogSink + 'static>(sink: S) -> Self {
        Self {
            sink: Arc::new(sink),
            level: Level::INFO,
            context: Arc::default(),
        }
    }

    pub fn stdout() -> Self {
        Self::new(JsonSink::new(io::stdout()))
    }

    /// Applies the application-wide settings: debug level when `debug` is
    /// set, and `@source` on every record.
    pub fn configure(self, app: &str, debug: bool) -> Self {
        let logger = if debug { self.level(Level::DEBUG) } else { self };
        logger.with_field(SOURCE_FIELD, app)
    }

    /// Same level and bound fields, writing JSON lines to `writer`.
    pub fn output<W: Write + Send + 'static>(&self, writer: W) -> Self {
        Self {
            sink: Arc::new(JsonSink::new(writer)),
            ..self.clone()
        }
    }

    /// Same sink and bound fields, with `level` as the most verbose level
    /// that is still emitted.
    pub fn level(&self, level: Level) -> Self {
        Self {
            level,
            ..self.clone()
        }
    }

    pub fn max_level(&self) -> Level {
        self.level
    }

    pub fn enabled(&self, level: Level) -> bool {
        level <= self.level
    }

    /// Child logger carrying `key` on every record.
    pub fn with_field(&self, key: &str, value: impl Into<Value>) -> Self {
        let mut context = (*self.context).clone();
        context.insert(key.to_string(), value.into());
        Self {
            context: Arc::new(context),
            ..self.clone()
        }
    }

    /// Child logger carrying `value` serialized as a nested object.
    pub fn with_object<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => self.with_field(key, value),
            Err(e) => {
                tracing::warn!(key, error = %e, "skipping unserializable log field");
                self.clone()
            }
        }
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.context.get(key)
    }

    pub fn debug(&self) -> Event<'_> {
        self.event(Some(Level::DEBUG))
    }

    pub fn info(&self) -> Event<'_> {
        self.event(Some(Level::INFO))
    }

    pub fn warn(&self) -> Event<'_> {
        self.event(Some(Level::WARN))
    }

    pub fn error(&self) -> Event<'_> {
        self.event(Some(Level::ERROR))
    }

    /// Starts an event without a level. It is emitted whatever the
    /// configured level is.
    pub fn log(&self) -> Event<'_> {
        self.event(None)
    }

    fn event(&self, level: Option<Level>) -> Event<'_> {
        let enabled = level.map_or(true, |level| self.enabled(level));
        Event {
            logger: self,
            level,
            fields: enabled.then(Map::new),
        }
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

/// A record under construction. Nothing is written until [`Event::msg`].
#[must_use = "call `msg` to emit the event"]
pub struct Event<'a> {
    logger: &'a Logger,
    level: Option<Level>,
    // None when the level is filtered out.
    fields: Option<Map<String, Value>>,
}

impl Event<'_> {
    pub fn field(mut self, key: &str, value: impl Into<Value>) -> Self {
        if let Some(fields) = self.fields.as_mut() {
            fields.insert(key.to_string(), value.into());
        }
        self
    }

    pub fn object<T: Serialize + ?Sized>(mut self, key: &str, value: &T) -> Self {
        if let Some(fields) = self.fields.as_mut() {
            match serde_json::to_value(value) {
                Ok(value) => {
                    fields.insert(key.to_string(), value);
                }
                Err(e) => tracing::warn!(key, error = %e, "skipping unserializable log field"),
            }
        }
        self
    }

    pub fn enabled(&self) -> bool {
        self.fields.is_some()
    }

    pub fn msg(self, message: &str) {
        let Some(fields) = self.fields else {
            return;
        };
        let mut record = (*self.logger.context).clone();
        record.extend(fields);
        self.logger.sink.record(&record, self.level, message);
    }
}
