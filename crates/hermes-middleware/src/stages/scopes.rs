//! Scope extraction and enforcement.

use crate::context::RequestState;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{HandlerResult, Request};
use hermes_auth::{authorize, AuthOutcome, Scopes, ScopesExtractor};
use hermes_telemetry::metrics::{record_auth_outcome, record_scope_denial};
use std::sync::Arc;

/// Derives granted scopes from verified claims.
///
/// Runs only when claims are present; extraction errors are recorded as a
/// failed outcome and the request continues.
#[derive(Clone)]
pub struct ScopesMiddleware {
    extractor: Arc<dyn ScopesExtractor>,
}

impl ScopesMiddleware {
    /// Creates the stage over `extractor`.
    #[must_use]
    pub fn new(extractor: Arc<dyn ScopesExtractor>) -> Self {
        Self { extractor }
    }
}

impl std::fmt::Debug for ScopesMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopesMiddleware").finish_non_exhaustive()
    }
}

impl Middleware for ScopesMiddleware {
    fn name(&self) -> &'static str {
        "scopes"
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
                    tracing::debug!(request_id = %state.request_id(), reason, "scope extraction failed");
                }
                record_auth_outcome("scopes", outcome.label());
                state.set_scopes(outcome);
            }
            next.run(state, request).await
        })
    }
}

/// Rejects requests lacking any of a fixed set of scopes.
///
/// Register it as an extra on operations that need it. Without extracted
/// scopes the granted set is empty.
///
/// ```
/// use hermes_middleware::stages::RequireScopesMiddleware;
///
/// let guard = RequireScopesMiddleware::new(["orders:read", "orders:write"]);
/// assert_eq!(guard.required().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct RequireScopesMiddleware {
    required: Scopes,
}

impl RequireScopesMiddleware {
    /// Requires every scope in `required`.
    pub fn new<I, S>(required: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            required: required.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the required scopes.
    #[must_use]
    pub fn required(&self) -> &Scopes {
        &self.required
    }
}

impl Middleware for RequireScopesMiddleware {
    fn name(&self) -> &'static str {
        "require_scopes"
    }

    fn process<'a>(
        &'a self,
        state: &'a mut RequestState,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            if let Err(error) = authorize(&self.required, state.scopes_outcome().present()) {
                record_scope_denial(state.operation().unwrap_or_default());
                return Err(error);
            }
            next.run(state, request).await
        })
    }
}
