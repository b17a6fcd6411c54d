//! Request logging and correlation middleware.
//!
//! ```text
//! request → logging (exclusion, timing)
//!         → correlation (resolve or mint X-Correlation-ID)
//!         → context (request-scoped logger in extensions)
//!         → handler, writing through response::InstrumentedSink
//!           (axum: body streamed through body::LoggedBody)
//!         → fields (completion projection) → one record
//! ```

pub mod body;
pub mod context;
pub mod correlation;
pub mod fields;
pub mod logging;
pub mod response;

pub use body::LoggedBody;
pub use context::{from_extensions, from_request, with_context_logger, RequestLog};
pub use correlation::{
    correlation_id, ensure_correlation_id, CorrelationId, IdGenerator, UuidGenerator,
    X_CORRELATION_ID,
};
pub use fields::{RequestFields, RequestSnapshot};
pub use logging::{instrument, log_requests, with_logger, Handler, InFlight, RequestLogging, WithLogger};
pub use response::{InstrumentedSink, ResponseRecorder, ResponseSink, SinkState};
