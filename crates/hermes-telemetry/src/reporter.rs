//! Error reporting collaborators.

use crate::metrics::record_error;
use hermes_core::{ErrorCategory, HermesError, RequestContext};

/// Receives every error a pipeline produces, before it is rendered.
pub trait ErrorReporter: Send + Sync {
    /// Reports `error` raised while serving `operation`.
    fn report(&self, context: &RequestContext, error: &HermesError, operation: &str);
}

/// Reporter that discards errors.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl ErrorReporter for NoopReporter {
    fn report(&self, _context: &RequestContext, _error: &HermesError, _operation: &str) {}
}

/// Reporter that logs errors and counts them.
///
/// Server-side failures are logged at `error`, client errors at `warn`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, context: &RequestContext, error: &HermesError, operation: &str) {
        record_error(operation, error.error_code());
        if error.category() == ErrorCategory::Internal {
            tracing::error!(
                request_id = %context.request_id(),
                operation = %operation,
                error.code = error.error_code(),
                error = %error,
                "operation failed"
            );
        } else {
            tracing::warn!(
                request_id = %context.request_id(),
                operation = %operation,
                error.code = error.error_code(),
                error = %error,
                "operation rejected"
            );
        }
    }
}
