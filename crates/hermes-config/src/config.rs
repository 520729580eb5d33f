//! The root configuration type and its builder.

use serde::{Deserialize, Serialize};

use crate::{AuthConfig, ConfigError, LogFormat, LoggingConfig, NegotiationConfig, ServiceConfig};

/// Complete Hermes service configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to layer files and environment
/// variables over the defaults.
///
/// # Example
///
/// ```
/// use hermes_config::HermesConfig;
///
/// let config = HermesConfig::default();
/// assert_eq!(config.service.name, "hermes-service");
/// assert!(!config.auth.enabled);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct HermesConfig {
    /// Service identity and request handling.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Offered media types.
    #[serde(default)]
    pub negotiation: NegotiationConfig,

    /// Bearer token authentication.
    #[serde(default)]
    pub auth: AuthConfig,
}

impl HermesConfig {
    /// Creates a configuration builder.
    #[must_use]
    pub fn builder() -> HermesConfigBuilder {
        HermesConfigBuilder::new()
    }

    /// Checks cross-field constraints that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service.name.trim().is_empty() {
            return Err(ConfigError::invalid_value("service.name", "must not be empty"));
        }

        if self.logging.enabled {
            hermes_telemetry::logging::create_env_filter(&self.logging.level)
                .map_err(|e| ConfigError::invalid_value("logging.level", e.to_string()))?;
        }

        self.negotiation.produced_types()?;
        self.negotiation.error_media_types()?;

        if self.auth.enabled {
            let secret = self.auth.jwt_secret.as_deref().unwrap_or_default();
            if secret.is_empty() {
                return Err(ConfigError::invalid_value(
                    "auth.jwt_secret",
                    "must be set when auth is enabled",
                ));
            }
            if self.auth.scopes_claim.trim().is_empty() {
                return Err(ConfigError::invalid_value("auth.scopes_claim", "must not be empty"));
            }
        }

        Ok(())
    }

    /// Local development preset: pretty debug logs with span events.
    ///
    /// ```
    /// use hermes_config::HermesConfig;
    ///
    /// let config = HermesConfig::development();
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config.logging.span_events = true;
        config.logging.include_location = true;
        config
    }

    /// Production preset: JSON logs at info level.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;
        config
    }
}

/// Builder for [`HermesConfig`].
#[derive(Debug, Default)]
pub struct HermesConfigBuilder {
    service: Option<ServiceConfig>,
    logging: Option<LoggingConfig>,
    negotiation: Option<NegotiationConfig>,
    auth: Option<AuthConfig>,
}

impl HermesConfigBuilder {
    /// Creates a builder with every section at its default.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the service section.
    #[must_use]
    pub fn service(mut self, service: ServiceConfig) -> Self {
        self.service = Some(service);
        self
    }

    /// Sets the logging section.
    #[must_use]
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Sets the negotiation section.
    #[must_use]
    pub fn negotiation(mut self, negotiation: NegotiationConfig) -> Self {
        self.negotiation = Some(negotiation);
        self
    }

    /// Sets the auth section.
    #[must_use]
    pub fn auth(mut self, auth: AuthConfig) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Builds the configuration; unset sections use their defaults.
    #[must_use]
    pub fn build(self) -> HermesConfig {
        HermesConfig {
            service: self.service.unwrap_or_default(),
            logging: self.logging.unwrap_or_default(),
            negotiation: self.negotiation.unwrap_or_default(),
            auth: self.auth.unwrap_or_default(),
        }
    }

    /// Builds and validates the configuration.
    pub fn build_validated(self) -> Result<HermesConfig, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}
