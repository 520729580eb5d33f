//! Typed configuration for Hermes services.
//!
//! [`HermesConfig`] holds everything a service needs at startup:
//!
//! - [`ServiceConfig`] - Service name and request-id trust
//! - [`LoggingConfig`] - Log level and format, converted to a
//!   [`LogConfig`](hermes_telemetry::LogConfig)
//! - [`NegotiationConfig`] - Media types offered for responses and errors
//! - [`AuthConfig`] - Bearer token verification and the scopes claim
//!
//! Every section rejects unknown fields. [`ConfigLoader`] layers defaults,
//! TOML/JSON sources and environment variables, then validates.
//!
//! # Example
//!
//! ```
//! use hermes_config::ConfigLoader;
//!
//! # fn main() -> Result<(), hermes_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_string(
//!         r#"
//!         [service]
//!         name = "orders"
//!
//!         [negotiation]
//!         produces = ["application/json", "application/xml"]
//!
//!         [auth]
//!         enabled = true
//!         jwt_secret = "change-me"
//!         scopes_claim = "scp"
//!         "#,
//!         "toml",
//!     )?
//!     .with_env_prefix("HERMES")
//!     .load()?;
//!
//! assert_eq!(config.service.name, "orders");
//! # Ok(())
//! # }
//! ```
//!
//! # Environment Variable Overrides
//!
//! Values are overridden with `PREFIX__SECTION__KEY` variables; list fields
//! take comma-separated values:
//!
//! - `HERMES__SERVICE__TRUST_REQUEST_ID=true`
//! - `HERMES__LOGGING__LEVEL=hermes_middleware=debug,info`
//! - `HERMES__NEGOTIATION__PRODUCES=application/json,text/plain`
//! - `HERMES__AUTH__JWT_SECRET=...`

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::{HermesConfig, HermesConfigBuilder};
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{
    AuthConfig, JwtAlgorithm, LogFormat, LoggingConfig, NegotiationConfig, ServiceConfig,
};
