//! Per-operation middleware pipelines.
//!
//! A [`PipelineBuilder`] collects the collaborators shared by every
//! operation and the extra middleware registered per operation. Building it
//! freezes that configuration into [`Pipelines`], which composes each
//! operation's [`Pipeline`] on first use and caches it.
//!
//! ## Stage order
//!
//! Outermost first:
//!
//! | # | Stage | Present |
//! |---|-------|---------|
//! | 1 | request context | always |
//! | 2 | tracing | always (no-op tracer by default) |
//! | 3 | error reporting | always (no-op reporter by default) |
//! | 4 | JWT claims | when a token verifier is set |
//! | 5 | user | when a user extractor is set |
//! | 6 | scopes | when a scopes extractor is set |
//! | 7 | extras | in registration order |
//!
//! Each stage wraps everything after it, so the first stage sees the
//! request first and the response (or error) last.

use crate::context::{RequestState, REQUEST_ID_HEADER};
use crate::error_encoder::{ErrorEncoder, NegotiatingErrorEncoder};
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::stages::{
    ErrorReportingMiddleware, JwtClaimsMiddleware, RequestContextMiddleware, ScopesMiddleware,
    TracingMiddleware, UserMiddleware,
};
use crate::types::{HandlerResult, Request, Response};
use dashmap::DashMap;
use hermes_auth::{ScopesExtractor, TokenVerifier, UserExtractor};
use hermes_telemetry::{ErrorReporter, NoopReporter, NoopTracer, Tracer};
use http::HeaderValue;
use std::collections::HashMap;
use std::sync::Arc;

/// A type-erased middleware that can be stored in a vector.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// Position of a stage in a composed pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    /// Request metadata population.
    RequestContext,
    /// Span creation and request metrics.
    Tracing,
    /// Error reporting.
    ErrorReporting,
    /// Bearer token verification.
    JwtClaims,
    /// User extraction.
    User,
    /// Scope extraction.
    Scopes,
    /// Middleware registered for the operation.
    Extra,
}

impl Stage {
    /// Returns the stage name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::RequestContext => "request_context",
            Self::Tracing => "tracing",
            Self::ErrorReporting => "error_reporting",
            Self::JwtClaims => "jwt_claims",
            Self::User => "user",
            Self::Scopes => "scopes",
            Self::Extra => "extra",
        }
    }
}

/// The composed middleware chain of one operation.
pub struct Pipeline {
    operation: Arc<str>,
    stages: Vec<(Stage, BoxedMiddleware)>,
    error_encoder: Arc<dyn ErrorEncoder>,
}

impl Pipeline {
    /// Returns the operation this pipeline serves.
    #[must_use]
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Runs `request` through every stage and then `handler`.
    ///
    /// Errors are returned as-is, after the error-reporting stage has seen
    /// them. Use [`serve`](Self::serve) to render them as responses.
    pub async fn process<H>(&self, state: &mut RequestState, request: Request, handler: H) -> HandlerResult
    where
        H: for<'s> FnOnce(&'s mut RequestState, Request) -> BoxFuture<'s, HandlerResult> + Send + 'static,
    {
        let mut next = Next::handler(handler);
        for (_, middleware) in self.stages.iter().rev() {
            next = Next::new(middleware.as_ref(), next);
        }
        next.run(state, request).await
    }

    /// Runs the pipeline with fresh request state and renders errors.
    pub async fn serve<H>(&self, request: Request, handler: H) -> Response
    where
        H: for<'s> FnOnce(&'s mut RequestState, Request) -> BoxFuture<'s, HandlerResult> + Send + 'static,
    {
        let mut state = RequestState::new();
        match self.process(&mut state, request, handler).await {
            Ok(response) => response,
            Err(error) => {
                let mut response = self.error_encoder.encode(&state, &error);
                if let Ok(value) = HeaderValue::from_str(&state.request_id().to_string()) {
                    response.headers_mut().insert(REQUEST_ID_HEADER, value);
                }
                response
            }
        }
    }

    /// Returns the stage kinds in order, outermost first.
    #[must_use]
    pub fn stages(&self) -> Vec<Stage> {
        self.stages.iter().map(|(stage, _)| *stage).collect()
    }

    /// Returns the middleware names in order, outermost first.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|(_, mw)| mw.name()).collect()
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("operation", &self.operation)
            .field("stages", &self.stage_names())
            .finish()
    }
}

/// Collects pipeline configuration.
///
/// # Example
///
/// ```
/// use hermes_middleware::stages::RequireScopesMiddleware;
/// use hermes_middleware::PipelineBuilder;
/// use hermes_telemetry::{LogReporter, SpanTracer};
///
/// let pipelines = PipelineBuilder::new()
///     .tracer(SpanTracer::new("orders"))
///     .error_reporter(LogReporter)
///     .register_middleware("deleteOrder", RequireScopesMiddleware::new(["orders:write"]))
///     .build();
///
/// let pipeline = pipelines.pipeline("deleteOrder");
/// assert_eq!(
///     pipeline.stage_names(),
///     ["request_context", "tracing", "error_reporting", "require_scopes"]
/// );
/// ```
#[derive(Default)]
pub struct PipelineBuilder {
    tracer: Option<Arc<dyn Tracer>>,
    reporter: Option<Arc<dyn ErrorReporter>>,
    error_encoder: Option<Arc<dyn ErrorEncoder>>,
    verifier: Option<Arc<dyn TokenVerifier>>,
    user_extractor: Option<Arc<dyn UserExtractor>>,
    scopes_extractor: Option<Arc<dyn ScopesExtractor>>,
    extras: HashMap<String, Vec<BoxedMiddleware>>,
    trust_request_id: bool,
}

impl PipelineBuilder {
    /// Creates a builder with no-op collaborators and no auth stages.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the tracer.
    #[must_use]
    pub fn tracer(mut self, tracer: impl Tracer + 'static) -> Self {
        self.tracer = Some(Arc::new(tracer));
        self
    }

    /// Sets the error reporter.
    #[must_use]
    pub fn error_reporter(mut self, reporter: impl ErrorReporter + 'static) -> Self {
        self.reporter = Some(Arc::new(reporter));
        self
    }

    /// Sets the error encoder. Defaults to [`NegotiatingErrorEncoder`].
    #[must_use]
    pub fn error_encoder(mut self, encoder: impl ErrorEncoder + 'static) -> Self {
        self.error_encoder = Some(Arc::new(encoder));
        self
    }

    /// Enables the JWT claims stage with `verifier`, usually a
    /// [`JwtParser`](hermes_auth::JwtParser).
    #[must_use]
    pub fn token_verifier(mut self, verifier: impl TokenVerifier + 'static) -> Self {
        self.verifier = Some(Arc::new(verifier));
        self
    }

    /// Enables the user stage.
    #[must_use]
    pub fn user_extractor(mut self, extractor: impl UserExtractor + 'static) -> Self {
        self.user_extractor = Some(Arc::new(extractor));
        self
    }

    /// Enables the scopes stage.
    #[must_use]
    pub fn scopes_extractor(mut self, extractor: impl ScopesExtractor + 'static) -> Self {
        self.scopes_extractor = Some(Arc::new(extractor));
        self
    }

    /// Adopts UUIDs from incoming `X-Request-Id` headers.
    #[must_use]
    pub fn trust_request_id(mut self, trust: bool) -> Self {
        self.trust_request_id = trust;
        self
    }

    /// Appends `middleware` to the extras of `operation`.
    ///
    /// Extras run innermost, after the built-in stages, in registration order.
    #[must_use]
    pub fn register_middleware<M: Middleware>(mut self, operation: impl Into<String>, middleware: M) -> Self {
        self.extras
            .entry(operation.into())
            .or_default()
            .push(Arc::new(middleware));
        self
    }

    /// Freezes the configuration.
    #[must_use]
    pub fn build(self) -> Pipelines {
        Pipelines {
            config: PipelineConfig {
                tracer: self.tracer.unwrap_or_else(|| Arc::new(NoopTracer)),
                reporter: self.reporter.unwrap_or_else(|| Arc::new(NoopReporter)),
                error_encoder: self
                    .error_encoder
                    .unwrap_or_else(|| Arc::new(NegotiatingErrorEncoder::default())),
                verifier: self.verifier,
                user_extractor: self.user_extractor,
                scopes_extractor: self.scopes_extractor,
                extras: self.extras,
                trust_request_id: self.trust_request_id,
            },
            cache: DashMap::new(),
        }
    }
}

struct PipelineConfig {
    tracer: Arc<dyn Tracer>,
    reporter: Arc<dyn ErrorReporter>,
    error_encoder: Arc<dyn ErrorEncoder>,
    verifier: Option<Arc<dyn TokenVerifier>>,
    user_extractor: Option<Arc<dyn UserExtractor>>,
    scopes_extractor: Option<Arc<dyn ScopesExtractor>>,
    extras: HashMap<String, Vec<BoxedMiddleware>>,
    trust_request_id: bool,
}

impl PipelineConfig {
    fn compose(&self, operation: &str) -> Pipeline {
        let mut stages: Vec<(Stage, BoxedMiddleware)> = vec![
            (
                Stage::RequestContext,
                Arc::new(RequestContextMiddleware::new(operation).trust_request_id(self.trust_request_id)),
            ),
            (Stage::Tracing, Arc::new(TracingMiddleware::new(Arc::clone(&self.tracer)))),
            (
                Stage::ErrorReporting,
                Arc::new(ErrorReportingMiddleware::new(Arc::clone(&self.reporter))),
            ),
        ];
        if let Some(verifier) = &self.verifier {
            stages.push((Stage::JwtClaims, Arc::new(JwtClaimsMiddleware::new(Arc::clone(verifier)))));
        }
        if let Some(extractor) = &self.user_extractor {
            stages.push((Stage::User, Arc::new(UserMiddleware::new(Arc::clone(extractor)))));
        }
        if let Some(extractor) = &self.scopes_extractor {
            stages.push((Stage::Scopes, Arc::new(ScopesMiddleware::new(Arc::clone(extractor)))));
        }
        if let Some(extras) = self.extras.get(operation) {
            stages.extend(extras.iter().map(|mw| (Stage::Extra, Arc::clone(mw))));
        }

        let pipeline = Pipeline {
            operation: Arc::from(operation),
            stages,
            error_encoder: Arc::clone(&self.error_encoder),
        };
        tracing::debug!(operation, stages = ?pipeline.stage_names(), "pipeline composed");
        pipeline
    }
}

/// Frozen pipeline configuration with a per-operation cache.
///
/// Safe to share between serving tasks. The first request for an operation
/// composes its pipeline while holding the cache entry, so concurrent first
/// requests wait for that one composition instead of racing.
pub struct Pipelines {
    config: PipelineConfig,
    cache: DashMap<String, Arc<Pipeline>>,
}

impl Pipelines {
    /// Returns the pipeline for `operation`, composing it on first use.
    pub fn pipeline(&self, operation: &str) -> Arc<Pipeline> {
        if let Some(pipeline) = self.cache.get(operation) {
            return Arc::clone(pipeline.value());
        }
        let entry = self
            .cache
            .entry(operation.to_string())
            .or_insert_with(|| Arc::new(self.config.compose(operation)));
        Arc::clone(entry.value())
    }

    /// Serves `request` for `operation`, rendering errors as responses.
    pub async fn serve<H>(&self, operation: &str, request: Request, handler: H) -> Response
    where
        H: for<'s> FnOnce(&'s mut RequestState, Request) -> BoxFuture<'s, HandlerResult> + Send + 'static,
    {
        self.pipeline(operation).serve(request, handler).await
    }

    /// Returns the operations with extra middleware registered, sorted.
    #[must_use]
    pub fn registered_operations(&self) -> Vec<&str> {
        let mut operations: Vec<&str> = self.config.extras.keys().map(String::as_str).collect();
        operations.sort_unstable();
        operations
    }

    /// Returns the number of composed pipelines.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Returns the error encoder used by [`serve`](Self::serve).
    #[must_use]
    pub fn error_encoder(&self) -> &Arc<dyn ErrorEncoder> {
        &self.config.error_encoder
    }
}

impl std::fmt::Debug for Pipelines {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipelines")
            .field("cached", &self.cached())
            .field("registered_operations", &self.registered_operations())
            .finish_non_exhaustive()
    }
}
