//! Bearer-token stage.
//!
//! Verifies the `Authorization: Bearer` token and records the outcome as
//! claims in the request state. Verification failures never abort the
//! request; later stages and handlers decide what a missing identity means.

use crate::context::RequestState;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{HandlerResult, Request};
use hermes_auth::{bearer_token, AuthOutcome, TokenVerifier};
use hermes_telemetry::metrics::record_auth_outcome;
use std::sync::Arc;

/// Stores verified token claims in the request state.
///
/// | `Authorization` header | Recorded claims |
/// |---|---|
/// | absent | `NotAttempted` |
/// | not a bearer token | `Failed` |
/// | bearer token, verification fails | `Failed` |
/// | bearer token, verified | `Present` |
#[derive(Clone)]
pub struct JwtClaimsMiddleware {
    verifier: Arc<dyn TokenVerifier>,
}

impl JwtClaimsMiddleware {
    /// Creates the stage over `verifier`.
    #[must_use]
    pub fn new(verifier: Arc<dyn TokenVerifier>) -> Self {
        Self { verifier }
    }

    fn verify(&self, state: &RequestState) -> Option<AuthOutcome<hermes_auth::Claims>> {
        let header = state.authorization()?;
        let outcome = match bearer_token(header) {
            Some(token) => AuthOutcome::from_result(self.verifier.verify(token)),
            None => AuthOutcome::Failed("authorization header is not a bearer token".to_string()),
        };
        Some(outcome)
    }
}

impl std::fmt::Debug for JwtClaimsMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtClaimsMiddleware").finish_non_exhaustive()
    }
}

impl Middleware for JwtClaimsMiddleware {
    fn name(&self) -> &'static str {
        "jwt_claims"
    }

    fn process<'a>(
        &'a self,
        state: &'a mut RequestState,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            if let Some(outcome) = self.verify(state) {
                if let Some(reason) = outcome.failure() {
                    tracing::debug!(request_id = %state.request_id(), reason, "token rejected");
                }
                record_auth_outcome("claims", outcome.label());
                state.set_claims(outcome);
            }
            next.run(state, request).await
        })
    }
}
