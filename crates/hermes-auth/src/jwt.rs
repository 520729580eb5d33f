//! Bearer token verification.
//!
//! A [`TokenVerifier`] turns a raw token into [`Claims`] or an error. The
//! bundled [`JwtParser`] verifies JWTs with `jsonwebtoken` from three parts
//! that are always supplied together:
//!
//! - a [`KeyResolver`] choosing the decoding key from the token header
//!   (for example by `kid`)
//! - the expected signing [`Algorithm`]
//! - a claims factory shaping the verified payload into [`Claims`]

use crate::claims::Claims;
use hermes_core::{HermesError, HermesResult};
use jsonwebtoken::{Algorithm, DecodingKey, Header, Validation};
use serde_json::Value;
use std::sync::Arc;

/// Verifies a bearer token and returns its claims.
pub trait TokenVerifier: Send + Sync {
    /// Verifies `token`.
    fn verify(&self, token: &str) -> HermesResult<Claims>;
}

/// Chooses the key used to verify a token.
pub trait KeyResolver: Send + Sync {
    /// Returns the decoding key for a token with this header.
    fn resolve(&self, header: &Header) -> HermesResult<DecodingKey>;
}

impl<F> KeyResolver for F
where
    F: Fn(&Header) -> HermesResult<DecodingKey> + Send + Sync,
{
    fn resolve(&self, header: &Header) -> HermesResult<DecodingKey> {
        self(header)
    }
}

/// A resolver that always returns the same key.
#[derive(Clone)]
pub struct StaticKey(DecodingKey);

impl StaticKey {
    /// Wraps a decoding key.
    #[must_use]
    pub fn new(key: DecodingKey) -> Self {
        Self(key)
    }

    /// Creates an HMAC key from a shared secret.
    #[must_use]
    pub fn from_secret(secret: &[u8]) -> Self {
        Self(DecodingKey::from_secret(secret))
    }
}

impl KeyResolver for StaticKey {
    fn resolve(&self, _header: &Header) -> HermesResult<DecodingKey> {
        Ok(self.0.clone())
    }
}

impl std::fmt::Debug for StaticKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticKey(<redacted>)")
    }
}

type ClaimsFactory = Arc<dyn Fn(Value) -> HermesResult<Claims> + Send + Sync>;

fn object_claims(payload: Value) -> HermesResult<Claims> {
    Claims::from_value(payload)
        .ok_or_else(|| HermesError::authentication("token payload is not a JSON object"))
}

/// JWT verifier built on `jsonwebtoken`.
///
/// # Example
///
/// ```
/// use hermes_auth::{JwtParser, StaticKey, TokenVerifier};
/// use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
/// use serde_json::json;
///
/// let token = encode(
///     &Header::new(Algorithm::HS256),
///     &json!({"sub": "user-1", "exp": 4_000_000_000_u64}),
///     &EncodingKey::from_secret(b"secret"),
/// )
/// .unwrap();
///
/// let parser = JwtParser::new(StaticKey::from_secret(b"secret"), Algorithm::HS256);
/// let claims = parser.verify(&token).unwrap();
/// assert_eq!(claims.subject(), Some("user-1"));
/// ```
#[derive(Clone)]
pub struct JwtParser {
    keys: Arc<dyn KeyResolver>,
    validation: Validation,
    claims: ClaimsFactory,
}

impl JwtParser {
    /// Creates a parser that accepts tokens signed with `algorithm`.
    ///
    /// `exp` is required and validated; the payload must be a JSON object.
    pub fn new(keys: impl KeyResolver + 'static, algorithm: Algorithm) -> Self {
        Self {
            keys: Arc::new(keys),
            validation: Validation::new(algorithm),
            claims: Arc::new(object_claims),
        }
    }

    /// Replaces the claims factory.
    #[must_use]
    pub fn with_claims_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(Value) -> HermesResult<Claims> + Send + Sync + 'static,
    {
        self.claims = Arc::new(factory);
        self
    }

    /// Requires the `aud` claim to contain one of `audience`.
    #[must_use]
    pub fn with_audience<T: ToString>(mut self, audience: &[T]) -> Self {
        self.validation.set_audience(audience);
        self
    }

    /// Requires the `iss` claim to be one of `issuers`.
    #[must_use]
    pub fn with_issuer<T: ToString>(mut self, issuers: &[T]) -> Self {
        self.validation.set_issuer(issuers);
        self
    }

    /// Sets the clock skew tolerance for `exp`/`nbf`, in seconds.
    #[must_use]
    pub fn with_leeway(mut self, seconds: u64) -> Self {
        self.validation.leeway = seconds;
        self
    }

    /// Returns the accepted algorithm.
    #[must_use]
    pub fn algorithm(&self) -> Algorithm {
        self.validation.algorithms.first().copied().unwrap_or_default()
    }
}

impl TokenVerifier for JwtParser {
    fn verify(&self, token: &str) -> HermesResult<Claims> {
        let header = jsonwebtoken::decode_header(token)
            .map_err(|e| HermesError::authentication(format!("malformed token: {e}")))?;
        let key = self.keys.resolve(&header)?;
        let data = jsonwebtoken::decode::<Value>(token, &key, &self.validation)
            .map_err(|e| HermesError::authentication(format!("invalid token: {e}")))?;
        (self.claims)(data.claims)
    }
}

impl std::fmt::Debug for JwtParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtParser")
            .field("algorithms", &self.validation.algorithms)
            .finish_non_exhaustive()
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
#[must_use]
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
