//! Layered configuration loading.
//!
//! Layers apply in order, later ones overriding individual fields of earlier
//! ones: built-in defaults (or a preset), then any number of TOML or JSON
//! sources, then `PREFIX__SECTION__KEY` environment variables.

use std::env;
use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::{ConfigError, HermesConfig, JwtAlgorithm, LogFormat};

/// Builds a [`HermesConfig`] from layered sources.
///
/// # Example
///
/// ```no_run
/// use hermes_config::ConfigLoader;
///
/// # fn main() -> Result<(), hermes_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_dotenv()?
///     .with_optional_file("hermes.toml")?
///     .with_env_prefix("HERMES")
///     .load()?;
/// println!("serving {}", config.service.name);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: HermesConfig,
    env_prefix: Option<String>,
    sources: usize,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a loader starting from the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: HermesConfig::default(),
            env_prefix: None,
            sources: 0,
        }
    }

    /// Starts from the development preset.
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = HermesConfig::development();
        self
    }

    /// Starts from the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = HermesConfig::production();
        self
    }

    /// Layers a TOML (`.toml`) or JSON (`.json`) file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing or unreadable, has
    /// another extension, fails to parse, or contains unknown fields.
    pub fn with_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        tracing::debug!(path = %path.display(), "loading configuration file");
        self.with_string(&content, &format)
    }

    /// Layers a file if it exists.
    ///
    /// # Errors
    ///
    /// Same as [`with_file`](Self::with_file) when the file exists.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Layers configuration text in `format` (`"toml"` or `"json"`).
    ///
    /// Only the fields present in `content` change.
    ///
    /// ```
    /// use hermes_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string("[auth]\nscopes_claim = \"scp\"", "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.auth.scopes_claim, "scp");
    /// assert_eq!(config.service.name, "hermes-service");
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        let layer: Value = match format.to_lowercase().as_str() {
            "toml" => {
                let table: toml::Table = toml::from_str(content)?;
                serde_json::to_value(table)?
            }
            "json" => serde_json::from_str(content)?,
            other => return Err(ConfigError::unsupported_format(other)),
        };

        let mut merged = serde_json::to_value(&self.config)?;
        merge(&mut merged, layer);
        self.config = serde_json::from_value(merged).map_err(ConfigError::SchemaError)?;
        self.sources += 1;
        Ok(self)
    }

    /// Reads environment overrides with `prefix`, e.g. `HERMES__AUTH__ENABLED`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Loads `.env` from the working directory or its parents, if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::DotenvError` if a `.env` file exists but is
    /// malformed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(e.into()),
        }
        Ok(self)
    }

    /// Loads an env file at `path`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::DotenvError` if it is missing or malformed.
    pub fn with_dotenv_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        dotenvy::from_path(path.as_ref())?;
        Ok(self)
    }

    /// Applies environment overrides and validates.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for an unparsable override or a configuration
    /// that fails [`HermesConfig::validate`].
    pub fn load(mut self) -> Result<HermesConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_overrides(&prefix, env::vars())?;
        }
        self.config.validate()?;

        tracing::debug!(
            sources = self.sources,
            service = %self.config.service.name,
            auth = self.config.auth.enabled,
            "configuration loaded"
        );
        Ok(self.config)
    }

    /// Returns the configuration without env overrides or validation.
    #[must_use]
    pub fn load_unvalidated(self) -> HermesConfig {
        self.config
    }

    fn apply_env_overrides<I>(&mut self, prefix: &str, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let marker = format!("{prefix}__");
        let mut overrides: Vec<_> = vars
            .into_iter()
            .filter(|(key, _)| key.starts_with(&marker))
            .collect();
        // Stable application order regardless of the environment.
        overrides.sort();

        for (key, value) in overrides {
            self.apply_env_var(&key, &value, prefix)?;
        }
        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let path = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
            .ok_or_else(|| ConfigError::env_parse_error(key, "invalid key format"))?;
        let parts: Vec<&str> = path.split("__").collect();

        let config = &mut self.config;
        match parts.as_slice() {
            ["SERVICE", "NAME"] => config.service.name = value.to_string(),
            ["SERVICE", "TRUST_REQUEST_ID"] => config.service.trust_request_id = parse_bool(key, value)?,

            ["LOGGING", "ENABLED"] => config.logging.enabled = parse_bool(key, value)?,
            ["LOGGING", "LEVEL"] => config.logging.level = value.to_string(),
            ["LOGGING", "FORMAT"] => {
                config.logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => return Err(ConfigError::env_parse_error(key, "expected 'json' or 'pretty'")),
                };
            }
            ["LOGGING", "SPAN_EVENTS"] => config.logging.span_events = parse_bool(key, value)?,
            ["LOGGING", "INCLUDE_LOCATION"] => config.logging.include_location = parse_bool(key, value)?,

            ["NEGOTIATION", "PRODUCES"] => config.negotiation.produces = parse_list(value),
            ["NEGOTIATION", "ERROR_TYPES"] => config.negotiation.error_types = parse_list(value),

            ["AUTH", "ENABLED"] => config.auth.enabled = parse_bool(key, value)?,
            ["AUTH", "JWT_SECRET"] => {
                config.auth.jwt_secret = (!value.is_empty()).then(|| value.to_string());
            }
            ["AUTH", "ALGORITHM"] => {
                config.auth.algorithm = match value.to_uppercase().as_str() {
                    "HS256" => JwtAlgorithm::HS256,
                    "HS384" => JwtAlgorithm::HS384,
                    "HS512" => JwtAlgorithm::HS512,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'HS256', 'HS384' or 'HS512'",
                        ))
                    }
                };
            }
            ["AUTH", "SCOPES_CLAIM"] => config.auth.scopes_claim = value.to_string(),
            ["AUTH", "LEEWAY_SECS"] => {
                config.auth.leeway_secs = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))?;
            }
            ["AUTH", "ISSUERS"] => config.auth.issuers = parse_list(value),
            ["AUTH", "AUDIENCES"] => config.auth.audiences = parse_list(value),

            _ => tracing::warn!(var = key, "ignoring unknown configuration variable"),
        }
        Ok(())
    }
}

/// Recursively overlays `layer` onto `base`. Objects merge key by key;
/// anything else replaces.
fn merge(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Object(base), Value::Object(layer)) => {
            for (key, value) in layer {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, layer) => *base = layer,
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::env_parse_error(key, "expected boolean")),
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_loader_defaults() {
        let config = ConfigLoader::new().load().unwrap();
        assert_eq!(config, HermesConfig::default());
    }

    #[test]
    fn test_loader_presets() {
        let dev = ConfigLoader::new().with_development().load().unwrap();
        assert_eq!(dev.logging.format, LogFormat::Pretty);
        let prod = ConfigLoader::new().with_production().load().unwrap();
        assert_eq!(prod.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_string_layer_keeps_unset_fields() {
        let config = ConfigLoader::new()
            .with_development()
            .with_string("[service]\nname = \"orders\"", "toml")
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config.service.name, "orders");
        // Preset values survive a layer that doesn't mention them.
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_later_layers_win() {
        let config = ConfigLoader::new()
            .with_string(r#"{"service": {"name": "a", "trust_request_id": true}}"#, "json")
            .unwrap()
            .with_string("[service]\nname = \"b\"", "toml")
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config.service.name, "b");
        assert!(config.service.trust_request_id);
    }

    #[test]
    fn test_unknown_field_in_layer() {
        let result = ConfigLoader::new().with_string("[auth]\nsecret = \"x\"", "toml");
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::SchemaError(_)));
        assert!(err.to_string().contains("secret"), "{err}");
    }

    #[test]
    fn test_unsupported_format() {
        let result = ConfigLoader::new().with_string("service: {}", "yaml");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat { .. })));
    }

    #[test]
    fn test_file_layers() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[negotiation]\nproduces = [\"application/xml\"]\n\n[auth]\nenabled = true\njwt_secret = \"s3cret\""
        )
        .unwrap();

        let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();
        assert_eq!(config.negotiation.produces, vec!["application/xml"]);
        assert_eq!(config.auth.jwt_secret.as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_file_with_unknown_extension() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        let result = ConfigLoader::new().with_file(file.path());
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat { .. })));
    }

    #[test]
    fn test_missing_files() {
        assert!(matches!(
            ConfigLoader::new().with_file("/nonexistent/hermes.toml"),
            Err(ConfigError::FileNotFound { .. })
        ));
        assert!(ConfigLoader::new().with_optional_file("/nonexistent/hermes.toml").is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let mut loader = ConfigLoader::new();
        loader
            .apply_env_overrides(
                "HERMES",
                vars(&[
                    ("HERMES__SERVICE__NAME", "billing"),
                    ("HERMES__SERVICE__TRUST_REQUEST_ID", "yes"),
                    ("HERMES__LOGGING__FORMAT", "pretty"),
                    ("HERMES__NEGOTIATION__PRODUCES", "application/json, application/xml"),
                    ("HERMES__AUTH__ALGORITHM", "hs384"),
                    ("HERMES__AUTH__AUDIENCES", "api,admin"),
                    ("OTHER__SERVICE__NAME", "ignored"),
                ]),
            )
            .unwrap();

        let config = loader.load_unvalidated();
        assert_eq!(config.service.name, "billing");
        assert!(config.service.trust_request_id);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.negotiation.produces, vec!["application/json", "application/xml"]);
        assert_eq!(config.auth.algorithm, JwtAlgorithm::HS384);
        assert_eq!(config.auth.audiences, vec!["api", "admin"]);
    }

    #[test]
    fn test_env_override_errors() {
        let mut loader = ConfigLoader::new();
        let err = loader
            .apply_env_var("HERMES__AUTH__ENABLED", "maybe", "HERMES")
            .unwrap_err();
        assert!(err.to_string().contains("HERMES__AUTH__ENABLED"));

        assert!(loader
            .apply_env_var("HERMES__AUTH__LEEWAY_SECS", "soon", "HERMES")
            .is_err());
        assert!(loader
            .apply_env_var("HERMES__AUTH__ALGORITHM", "RS256", "HERMES")
            .is_err());
    }

    #[test]
    fn test_env_empty_secret_clears() {
        let mut loader = ConfigLoader::new()
            .with_string("[auth]\njwt_secret = \"old\"", "toml")
            .unwrap();
        loader.apply_env_var("HERMES__AUTH__JWT_SECRET", "", "HERMES").unwrap();
        assert_eq!(loader.load_unvalidated().auth.jwt_secret, None);
    }

    #[test]
    fn test_unknown_env_var_ignored() {
        let mut loader = ConfigLoader::new();
        assert!(loader.apply_env_var("HERMES__SERVER__PORT", "8080", "HERMES").is_ok());
    }

    #[test]
    fn test_parse_bool() {
        for yes in ["true", "TRUE", "1", "yes", "on"] {
            assert!(parse_bool("K", yes).unwrap());
        }
        for no in ["false", "0", "no", "Off"] {
            assert!(!parse_bool("K", no).unwrap());
        }
        assert!(parse_bool("K", "").is_err());
    }

    #[test]
    fn test_merge_replaces_arrays() {
        let mut base = serde_json::json!({"a": {"list": [1, 2], "keep": true}});
        merge(&mut base, serde_json::json!({"a": {"list": [3]}}));
        assert_eq!(base, serde_json::json!({"a": {"list": [3], "keep": true}}));
    }
}
