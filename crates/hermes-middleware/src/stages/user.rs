//! User-extraction stage.

use crate::context::RequestState;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{HandlerResult, Request};
use hermes_auth::{AuthOutcome, UserExtractor};
use hermes_telemetry::metrics::record_auth_outcome;
use std::sync::Arc;

/// Derives the user from verified claims.
///
/// Runs only when claims are present; extraction errors are recorded as a
/// failed outcome and the request continues.
#[derive(Clone)]
pub struct UserMiddleware {
    extractor: Arc<dyn UserExtractor>,
}

impl UserMiddleware {
    /// Creates the stage over `extractor`.
    #[must_use]
    pub fn new(extractor: Arc<dyn UserExtractor>) -> Self {
        Self { extractor }
    }
}

impl std::fmt::Debug for UserMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserMiddleware").finish_non_exhaustive()
    }
}

impl Middleware for UserMiddleware {
    fn name(&self) -> &'static str {
        "user"
    }

    fn process<'a>(
        &'a self,
        state: &'a mut RequestState,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            if let Ok(claims) = state.claims() {
                let outcome = AuthOutcome::from_result(self.extractor.extract(claims));
                if let Some(reason) = outcome.failure() {
                    tracing::debug!(request_id = %state.request_id(), reason, "user extraction failed");
                }
                record_auth_outcome("user", outcome.label());
                state.set_user(outcome);
            }
            next.run(state, request).await
        })
    }
}
