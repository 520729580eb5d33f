//! Observability collaborators for Hermes.
//!
//! - **Logging**: `tracing-subscriber` setup, JSON or human-readable
//! - **Tracing**: [`Tracer`] opens one span per operation; W3C
//!   `traceparent` propagation via [`TraceContext`]
//! - **Error reporting**: [`ErrorReporter`] sees every pipeline error
//! - **Metrics**: counters and histograms through the `metrics` facade
//!
//! # Example
//!
//! ```rust,ignore
//! use hermes_telemetry::{init_telemetry, LogConfig};
//!
//! init_telemetry(&LogConfig::production())?;
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod logging;
pub mod metrics;
pub mod reporter;
pub mod tracer;

pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig};
pub use reporter::{ErrorReporter, LogReporter, NoopReporter};
pub use tracer::{NoopTracer, SpanTracer, TraceContext, TraceFlags, Tracer};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Installs logging and registers metric descriptions.
///
/// # Errors
///
/// Returns `TelemetryError` if the subscriber cannot be installed.
pub fn init_telemetry(logging: &LogConfig) -> TelemetryResult<()> {
    init_logging(logging)?;
    metrics::describe_metrics();
    Ok(())
}
