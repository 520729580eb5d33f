//! Error-reporting stage.
//!
//! Hands every error raised by inner stages or the handler to the configured
//! [`ErrorReporter`], then passes it outward unchanged.

use crate::context::RequestState;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{HandlerResult, Request};
use hermes_telemetry::{ErrorReporter, NoopReporter};
use std::sync::Arc;

/// Reports errors on their way out of the pipeline.
#[derive(Clone)]
pub struct ErrorReportingMiddleware {
    reporter: Arc<dyn ErrorReporter>,
}

impl ErrorReportingMiddleware {
    /// Creates the stage over `reporter`.
    #[must_use]
    pub fn new(reporter: Arc<dyn ErrorReporter>) -> Self {
        Self { reporter }
    }

    /// Creates a stage that reports nowhere.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(Arc::new(NoopReporter))
    }
}

impl std::fmt::Debug for ErrorReportingMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorReportingMiddleware").finish_non_exhaustive()
    }
}

impl Middleware for ErrorReportingMiddleware {
    fn name(&self) -> &'static str {
        "error_reporting"
    }

    fn process<'a>(
        &'a self,
        state: &'a mut RequestState,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            let result = next.run(state, request).await;
            if let Err(error) = &result {
                let operation = state.operation().unwrap_or_default();
                self.reporter.report(&state.to_request_context(), error, operation);
            }
            result
        })
    }
}
