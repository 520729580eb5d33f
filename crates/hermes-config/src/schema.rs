//! Configuration section types.

use hermes_core::MimeType;
use hermes_telemetry::LogConfig;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Service identity and request handling.
///
/// # Example
///
/// ```
/// use hermes_config::ServiceConfig;
///
/// let service = ServiceConfig {
///     name: "orders".to_string(),
///     trust_request_id: true,
/// };
/// assert!(service.trust_request_id);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Service name, attached to spans and logs.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Adopt a well-formed `X-Request-Id` sent by the client instead of
    /// generating one. Enable only behind a gateway that sets it.
    #[serde(default)]
    pub trust_request_id: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            trust_request_id: false,
        }
    }
}

fn default_service_name() -> String {
    "hermes-service".to_string()
}

/// Log format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON formatted logs (production).
    #[default]
    Json,
    /// Human-readable pretty format (development).
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Install a subscriber at startup.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive, e.g. `info` or `hermes_middleware=debug,warn`.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Log span open and close events.
    #[serde(default)]
    pub span_events: bool,

    /// Include source file and line.
    #[serde(default)]
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            span_events: false,
            include_location: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl From<&LoggingConfig> for LogConfig {
    fn from(config: &LoggingConfig) -> Self {
        Self {
            enabled: config.enabled,
            level: config.level.clone(),
            json_format: config.format == LogFormat::Json,
            span_events: config.span_events,
            file_line_info: config.include_location,
            include_target: true,
        }
    }
}

/// Media types a service offers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct NegotiationConfig {
    /// Types an operation produces unless it declares its own. Client
    /// weights decide among them, not the order of this list.
    #[serde(default = "default_types")]
    pub produces: Vec<String>,

    /// Types error envelopes may be rendered in. The first one is used when
    /// the client sends no `Accept` header.
    #[serde(default = "default_types")]
    pub error_types: Vec<String>,
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            produces: default_types(),
            error_types: default_types(),
        }
    }
}

fn default_types() -> Vec<String> {
    vec![
        MimeType::APPLICATION_JSON.to_string(),
        MimeType::TEXT_PLAIN.to_string(),
    ]
}

impl NegotiationConfig {
    /// Parses [`produces`](Self::produces).
    pub fn produced_types(&self) -> Result<Vec<MimeType>, ConfigError> {
        parse_types("negotiation.produces", &self.produces)
    }

    /// Parses [`error_types`](Self::error_types).
    pub fn error_media_types(&self) -> Result<Vec<MimeType>, ConfigError> {
        parse_types("negotiation.error_types", &self.error_types)
    }
}

fn parse_types(field: &str, values: &[String]) -> Result<Vec<MimeType>, ConfigError> {
    if values.is_empty() {
        return Err(ConfigError::invalid_value(field, "at least one media type is required"));
    }
    values
        .iter()
        .map(|value| match MimeType::parse(value) {
            Some(mime) if !mime.is_wildcard() => Ok(mime),
            Some(_) => Err(ConfigError::invalid_value(
                field,
                format!("{value} is a wildcard; offered types must be concrete"),
            )),
            None => Err(ConfigError::invalid_value(field, format!("{value} is not a media type"))),
        })
        .collect()
}

/// HMAC algorithm used to verify bearer tokens.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[allow(clippy::upper_case_acronyms)]
pub enum JwtAlgorithm {
    /// HMAC with SHA-256.
    #[default]
    HS256,
    /// HMAC with SHA-384.
    HS384,
    /// HMAC with SHA-512.
    HS512,
}

/// Bearer token authentication.
///
/// When disabled no auth stages are composed and `claims()`, `user()` and
/// `scopes()` report missing state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Compose the JWT, user and scopes stages.
    #[serde(default)]
    pub enabled: bool,

    /// Shared HMAC secret. Required when enabled.
    #[serde(default)]
    pub jwt_secret: Option<String>,

    /// Signature algorithm.
    #[serde(default)]
    pub algorithm: JwtAlgorithm,

    /// Claim holding the granted scopes.
    #[serde(default = "default_scopes_claim")]
    pub scopes_claim: String,

    /// Clock skew tolerated on `exp` and `nbf`, in seconds.
    #[serde(default = "default_leeway")]
    pub leeway_secs: u64,

    /// Accepted `iss` values. Empty accepts any issuer.
    #[serde(default)]
    pub issuers: Vec<String>,

    /// Accepted `aud` values. When empty, tokens carrying an `aud` claim
    /// are rejected.
    #[serde(default)]
    pub audiences: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            jwt_secret: None,
            algorithm: JwtAlgorithm::default(),
            scopes_claim: default_scopes_claim(),
            leeway_secs: default_leeway(),
            issuers: Vec::new(),
            audiences: Vec::new(),
        }
    }
}

fn default_scopes_claim() -> String {
    "scope".to_string()
}

fn default_leeway() -> u64 {
    60
}

fn default_true() -> bool {
    true
}
