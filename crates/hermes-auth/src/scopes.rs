//! Authorization scopes.

use crate::claims::Claims;
use hermes_core::{HermesError, HermesResult};
use serde_json::Value;
use std::collections::BTreeSet;

/// A set of granted or required scopes.
pub type Scopes = BTreeSet<String>;

/// Derives granted scopes from verified claims.
pub trait ScopesExtractor: Send + Sync {
    /// Extracts the scopes. Errors are recorded, never raised.
    fn extract(&self, claims: &Claims) -> HermesResult<Scopes>;
}

impl<F> ScopesExtractor for F
where
    F: Fn(&Claims) -> HermesResult<Scopes> + Send + Sync,
{
    fn extract(&self, claims: &Claims) -> HermesResult<Scopes> {
        self(claims)
    }
}

/// Reads scopes from a single claim.
///
/// The claim may be a space-delimited string (`"read write"`, RFC 8693) or
/// an array of strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimScopes {
    claim: String,
}

impl ClaimScopes {
    /// The claim read by default.
    pub const DEFAULT_CLAIM: &'static str = "scope";

    /// Reads scopes from `claim`.
    #[must_use]
    pub fn new(claim: impl Into<String>) -> Self {
        Self {
            claim: claim.into(),
        }
    }

    /// Returns the claim name.
    #[must_use]
    pub fn claim(&self) -> &str {
        &self.claim
    }
}

impl Default for ClaimScopes {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CLAIM)
    }
}

impl ScopesExtractor for ClaimScopes {
    fn extract(&self, claims: &Claims) -> HermesResult<Scopes> {
        match claims.get(&self.claim) {
            Some(Value::String(scopes)) => Ok(scopes.split_whitespace().map(String::from).collect()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str().map(String::from).ok_or_else(|| {
                        HermesError::authentication(format!(
                            "claim {:?} contains a non-string scope",
                            self.claim
                        ))
                    })
                })
                .collect(),
            Some(_) => Err(HermesError::authentication(format!(
                "claim {:?} is not a string or array",
                self.claim
            ))),
            None => Err(HermesError::authentication(format!(
                "claim {:?} not found",
                self.claim
            ))),
        }
    }
}

/// Returns the required scopes not present in `granted`.
#[must_use]
pub fn missing_scopes(required: &Scopes, granted: &Scopes) -> Scopes {
    required.difference(granted).cloned().collect()
}

/// Checks that every required scope was granted.
///
/// Absent scopes count as an empty grant.
///
/// ```
/// use hermes_auth::{authorize, Scopes};
///
/// let required: Scopes = ["read", "write"].into_iter().map(String::from).collect();
/// let granted: Scopes = ["read"].into_iter().map(String::from).collect();
///
/// let err = authorize(&required, Some(&granted)).unwrap_err();
/// assert_eq!(err.to_string(), "request is missing these scopes: write");
/// ```
pub fn authorize(required: &Scopes, granted: Option<&Scopes>) -> HermesResult<()> {
    let empty = Scopes::new();
    let missing = missing_scopes(required, granted.unwrap_or(&empty));
    if missing.is_empty() {
        Ok(())
    } else {
        Err(HermesError::AuthorizationDenied { missing })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scopes(values: &[&str]) -> Scopes {
        values.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_claim_scopes_string() {
        let claims = Claims::from_value(json!({"scope": "read  write"})).unwrap();
        assert_eq!(ClaimScopes::default().extract(&claims).unwrap(), scopes(&["read", "write"]));
    }

    #[test]
    fn test_claim_scopes_array() {
        let claims = Claims::from_value(json!({"scp": ["admin", "read"]})).unwrap();
        assert_eq!(ClaimScopes::new("scp").extract(&claims).unwrap(), scopes(&["admin", "read"]));
    }

    #[test]
    fn test_claim_scopes_errors() {
        let missing = Claims::default();
        assert!(ClaimScopes::default().extract(&missing).is_err());

        let wrong = Claims::from_value(json!({"scope": 5})).unwrap();
        assert!(ClaimScopes::default().extract(&wrong).is_err());

        let mixed = Claims::from_value(json!({"scope": ["read", 1]})).unwrap();
        assert!(ClaimScopes::default().extract(&mixed).is_err());
    }

    #[test]
    fn test_authorize() {
        let required = scopes(&["read", "write"]);
        assert!(authorize(&required, Some(&scopes(&["read", "write", "admin"]))).is_ok());

        let err = authorize(&required, Some(&scopes(&["read"]))).unwrap_err();
        assert!(matches!(&err, HermesError::AuthorizationDenied { missing } if *missing == scopes(&["write"])));

        let err = authorize(&required, None).unwrap_err();
        assert_eq!(err.to_string(), "request is missing these scopes: read, write");
    }

    #[test]
    fn test_authorize_nothing_required() {
        assert!(authorize(&Scopes::new(), None).is_ok());
    }
}
