//! A configured Hermes service.

use std::sync::Arc;

use hermes_auth::{subject_user, ClaimScopes, JwtParser, StaticKey, UserExtractor};
use hermes_config::{ConfigError, HermesConfig, JwtAlgorithm};
use hermes_core::{HermesError, HermesResult, MimeType};
use hermes_middleware::stages::{ContentNegotiationMiddleware, RequireScopesMiddleware};
use hermes_middleware::{
    decode_request, encode_response_with_status, BoxFuture, ErrorEncoder, HandlerResult,
    Middleware, NegotiatingErrorEncoder, PipelineBuilder, Pipelines, Request, RequestState,
    Response,
};
use hermes_negotiate::codec::Payload;
use hermes_negotiate::{CodecRegistry, ContentNegotiation};
use hermes_telemetry::{ErrorReporter, LogConfig, LogReporter, SpanTracer, TelemetryError, Tracer};
use http::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Errors raised while assembling a [`Service`].
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Logging could not be installed.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    /// A configured media type has no codec.
    #[error(transparent)]
    Codec(#[from] HermesError),
}

/// Operations, their pipelines and the negotiation they share.
///
/// # Example
///
/// ```
/// use hermes::prelude::*;
/// use http::StatusCode;
///
/// # tokio_test::block_on(async {
/// let service = Service::builder(HermesConfig::default())
///     .unwrap()
///     .negotiate("ping")
///     .build()
///     .unwrap();
///
/// let request = http::Request::builder()
///     .uri("/ping")
///     .body(http_body_util::Full::new(bytes::Bytes::new()))
///     .unwrap();
/// let response = service
///     .handle("ping", request, |state, _request| {
///         Box::pin(async move { respond(state, &"pong") })
///     })
///     .await;
/// assert_eq!(response.status(), StatusCode::OK);
/// # });
/// ```
pub struct Service {
    config: HermesConfig,
    negotiation: ContentNegotiation,
    produces: Vec<MimeType>,
    pipelines: Pipelines,
}

impl Service {
    /// Starts a builder from `config`.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Config` if `config` fails validation.
    pub fn builder(config: HermesConfig) -> Result<ServiceBuilder, ServiceError> {
        ServiceBuilder::new(config)
    }

    /// Builds a service with no per-operation extras.
    ///
    /// # Errors
    ///
    /// See [`Service::builder`] and [`ServiceBuilder::build`].
    pub fn from_config(config: HermesConfig) -> Result<Self, ServiceError> {
        Self::builder(config)?.build()
    }

    /// Returns the configuration the service was built from.
    pub fn config(&self) -> &HermesConfig {
        &self.config
    }

    /// Returns the shared content negotiation.
    pub fn negotiation(&self) -> &ContentNegotiation {
        &self.negotiation
    }

    /// Returns the default produced types, as configured.
    pub fn produces(&self) -> &[MimeType] {
        &self.produces
    }

    /// Returns the pipelines.
    pub fn pipelines(&self) -> &Pipelines {
        &self.pipelines
    }

    /// Serves `request` for `operation`.
    ///
    /// Errors from any stage or the handler are rendered by the configured
    /// error encoder.
    pub async fn handle<H>(&self, operation: &str, request: Request, handler: H) -> Response
    where
        H: for<'s> FnOnce(&'s mut RequestState, Request) -> BoxFuture<'s, HandlerResult> + Send + 'static,
    {
        self.pipelines.serve(operation, request, handler).await
    }

    /// Decodes a request body, accepting `consumes` or, if empty, the
    /// default produced types.
    pub async fn decode<T: DeserializeOwned>(&self, consumes: &[MimeType], request: Request) -> HermesResult<T> {
        let accepts = if consumes.is_empty() { &self.produces[..] } else { consumes };
        decode_request(&self.negotiation, accepts, request).await
    }
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("name", &self.config.service.name)
            .field("produces", &self.produces)
            .field("operations", &self.pipelines.registered_operations())
            .finish_non_exhaustive()
    }
}

/// Encodes `value` with the response type negotiated for this request.
///
/// The operation must have been registered with
/// [`ServiceBuilder::negotiate`] or [`ServiceBuilder::negotiate_with`].
pub fn respond<T: Serialize>(state: &RequestState, value: &T) -> HandlerResult {
    respond_with_status(state, StatusCode::OK, value)
}

/// Like [`respond`] with an explicit status.
pub fn respond_with_status<T: Serialize>(state: &RequestState, status: StatusCode, value: &T) -> HandlerResult {
    let encoder = state.response_encoder().ok_or_else(|| {
        HermesError::internal(format!(
            "no response type negotiated for {}",
            state.operation().unwrap_or("operation")
        ))
    })?;
    encode_response_with_status(encoder, status, Payload::value(value))
}

/// Assembles a [`Service`].
pub struct ServiceBuilder {
    config: HermesConfig,
    negotiation: ContentNegotiation,
    produces: Vec<MimeType>,
    error_types: Vec<MimeType>,
    pipelines: PipelineBuilder,
    custom_error_encoder: bool,
    install_logging: bool,
}

impl ServiceBuilder {
    fn new(config: HermesConfig) -> Result<Self, ServiceError> {
        config.validate()?;
        let produces = config.negotiation.produced_types()?;
        let error_types = config.negotiation.error_media_types()?;
        let negotiation = ContentNegotiation::new(Arc::new(CodecRegistry::with_defaults()));

        let mut pipelines = PipelineBuilder::new()
            .tracer(SpanTracer::new(config.service.name.clone()))
            .error_reporter(LogReporter)
            .trust_request_id(config.service.trust_request_id);

        let auth = &config.auth;
        if auth.enabled {
            // validate() guarantees a non-empty secret here.
            let secret = auth.jwt_secret.as_deref().unwrap_or_default();
            let mut parser = JwtParser::new(StaticKey::from_secret(secret.as_bytes()), algorithm(auth.algorithm))
                .with_leeway(auth.leeway_secs);
            if !auth.issuers.is_empty() {
                parser = parser.with_issuer(auth.issuers.as_slice());
            }
            if !auth.audiences.is_empty() {
                parser = parser.with_audience(auth.audiences.as_slice());
            }
            pipelines = pipelines
                .token_verifier(parser)
                .user_extractor(subject_user)
                .scopes_extractor(ClaimScopes::new(auth.scopes_claim.clone()));
        }

        Ok(Self {
            config,
            negotiation,
            produces,
            error_types,
            pipelines,
            custom_error_encoder: false,
            install_logging: false,
        })
    }

    /// Returns the codec registry, for adding codecs before serving.
    pub fn registry(&self) -> &Arc<CodecRegistry> {
        self.negotiation.registry()
    }

    /// Installs the global log subscriber on [`build`](Self::build) when
    /// logging is enabled in the configuration.
    #[must_use]
    pub fn install_logging(mut self, install: bool) -> Self {
        self.install_logging = install;
        self
    }

    /// Replaces the span tracer.
    #[must_use]
    pub fn tracer(mut self, tracer: impl Tracer + 'static) -> Self {
        self.pipelines = self.pipelines.tracer(tracer);
        self
    }

    /// Replaces the log reporter.
    #[must_use]
    pub fn error_reporter(mut self, reporter: impl ErrorReporter + 'static) -> Self {
        self.pipelines = self.pipelines.error_reporter(reporter);
        self
    }

    /// Replaces the negotiating error encoder.
    #[must_use]
    pub fn error_encoder(mut self, encoder: impl ErrorEncoder + 'static) -> Self {
        self.pipelines = self.pipelines.error_encoder(encoder);
        self.custom_error_encoder = true;
        self
    }

    /// Replaces the `sub`-claim user extractor. Has no effect unless auth
    /// is enabled.
    #[must_use]
    pub fn user_extractor(mut self, extractor: impl UserExtractor + 'static) -> Self {
        if self.config.auth.enabled {
            self.pipelines = self.pipelines.user_extractor(extractor);
        }
        self
    }

    /// Appends an extra stage to `operation`.
    #[must_use]
    pub fn register_middleware<M: Middleware>(mut self, operation: impl Into<String>, middleware: M) -> Self {
        self.pipelines = self.pipelines.register_middleware(operation, middleware);
        self
    }

    /// Negotiates the response type of `operation` among the default
    /// produced types.
    #[must_use]
    pub fn negotiate(self, operation: impl Into<String>) -> Self {
        let produces = self.produces.clone();
        self.negotiate_with(operation, produces)
    }

    /// Negotiates the response type of `operation` among `produces`.
    #[must_use]
    pub fn negotiate_with(self, operation: impl Into<String>, produces: Vec<MimeType>) -> Self {
        let stage = ContentNegotiationMiddleware::new(self.negotiation.clone(), produces);
        self.register_middleware(operation, stage)
    }

    /// Rejects requests to `operation` lacking any of `scopes`.
    #[must_use]
    pub fn require_scopes<I, S>(self, operation: impl Into<String>, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.register_middleware(operation, RequireScopesMiddleware::new(scopes))
    }

    /// Finishes the service.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Codec` if a default produced type has no
    /// encoder, or `ServiceError::Telemetry` if logging was requested and a
    /// subscriber is already installed.
    pub fn build(self) -> Result<Service, ServiceError> {
        let registry = self.negotiation.registry();
        if let Some(mime) = self.produces.iter().find(|mime| registry.encoder(mime).is_none()) {
            return Err(HermesError::UnregisteredCodec { mime: mime.clone() }.into());
        }

        if self.install_logging {
            hermes_telemetry::init_logging(&LogConfig::from(&self.config.logging))?;
        }
        hermes_telemetry::metrics::describe_metrics();

        let mut pipelines = self.pipelines;
        if !self.custom_error_encoder {
            pipelines = pipelines
                .error_encoder(NegotiatingErrorEncoder::new(self.negotiation.clone()).with_types(self.error_types));
        }
        let pipelines = pipelines.build();

        tracing::info!(
            service.name = %self.config.service.name,
            auth = self.config.auth.enabled,
            produces = ?self.produces,
            "service ready"
        );

        Ok(Service {
            config: self.config,
            negotiation: self.negotiation,
            produces: self.produces,
            pipelines,
        })
    }
}

impl std::fmt::Debug for ServiceBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceBuilder")
            .field("name", &self.config.service.name)
            .field("produces", &self.produces)
            .finish_non_exhaustive()
    }
}

const fn algorithm(algorithm: JwtAlgorithm) -> jsonwebtoken::Algorithm {
    match algorithm {
        JwtAlgorithm::HS256 => jsonwebtoken::Algorithm::HS256,
        JwtAlgorithm::HS384 => jsonwebtoken::Algorithm::HS384,
        JwtAlgorithm::HS512 => jsonwebtoken::Algorithm::HS512,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_config::{AuthConfig, NegotiationConfig};

    #[test]
    fn test_builder_rejects_invalid_config() {
        let config = HermesConfig::builder()
            .auth(AuthConfig {
                enabled: true,
                ..Default::default()
            })
            .build();
        assert!(matches!(Service::builder(config), Err(ServiceError::Config(_))));
    }

    #[test]
    fn test_unregistered_produced_type() {
        let config = HermesConfig::builder()
            .negotiation(NegotiationConfig {
                produces: vec!["application/cbor".to_string()],
                ..Default::default()
            })
            .build();
        let err = Service::from_config(config).unwrap_err();
        assert_eq!(err.to_string(), "application/cbor isn't a registered codec");
    }

    #[test]
    fn test_produces_follow_config_order() {
        let config = HermesConfig::builder()
            .negotiation(NegotiationConfig {
                produces: vec!["application/xml".to_string(), "application/json".to_string()],
                ..Default::default()
            })
            .build();
        let service = Service::from_config(config).unwrap();
        assert_eq!(
            service.produces(),
            [MimeType::APPLICATION_XML, MimeType::APPLICATION_JSON]
        );
    }

    #[test]
    fn test_auth_stages_follow_config() {
        let service = Service::from_config(HermesConfig::default()).unwrap();
        assert_eq!(service.pipelines().pipeline("op").stage_count(), 3);

        let config = HermesConfig::builder()
            .auth(AuthConfig {
                enabled: true,
                jwt_secret: Some("s3cret".to_string()),
                ..Default::default()
            })
            .build();
        let service = Service::from_config(config).unwrap();
        assert_eq!(
            service.pipelines().pipeline("op").stage_names(),
            ["request_context", "tracing", "error_reporting", "jwt_claims", "user", "scopes"]
        );
    }

    #[test]
    fn test_builder_extras_in_registration_order() {
        let service = Service::builder(HermesConfig::default())
            .unwrap()
            .negotiate("getOrder")
            .require_scopes("getOrder", ["orders:read"])
            .build()
            .unwrap();
        let names = service.pipelines().pipeline("getOrder").stage_names();
        assert_eq!(names[3..], ["content_negotiation", "require_scopes"]);
    }

    #[test]
    fn test_algorithm_mapping() {
        assert_eq!(algorithm(JwtAlgorithm::HS512), jsonwebtoken::Algorithm::HS512);
    }
}
