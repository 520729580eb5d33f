//! User identity derived from claims.

use crate::claims::Claims;
use hermes_core::{HermesError, HermesResult};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

/// The minimum a user object provides.
///
/// `unique_id` must be stable and byte-exact: ids that differ only in case
/// are different users. Numeric ids should be encoded consistently (for
/// example big-endian bytes).
pub trait User: Debug + Send + Sync {
    /// Returns the bytes that uniquely identify this user.
    fn unique_id(&self) -> &[u8];
}

/// A user with contact and display details.
pub trait ExtendedUser: User {
    /// Returns an address for communicating with the user.
    fn email(&self) -> &str;

    /// Returns a name to address the user by.
    fn display_name(&self) -> HermesResult<String>;

    /// Returns undocumented extra attributes.
    fn details(&self) -> HashMap<String, String>;
}

/// Derives a user from verified claims.
pub trait UserExtractor: Send + Sync {
    /// Extracts the user. Errors are recorded, never raised.
    fn extract(&self, claims: &Claims) -> HermesResult<Arc<dyn User>>;
}

impl<F> UserExtractor for F
where
    F: Fn(&Claims) -> HermesResult<Arc<dyn User>> + Send + Sync,
{
    fn extract(&self, claims: &Claims) -> HermesResult<Arc<dyn User>> {
        self(claims)
    }
}

/// A user identified only by the token's `sub` claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectUser {
    subject: String,
}

impl SubjectUser {
    /// Creates a user from a subject string.
    #[must_use]
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
        }
    }

    /// Returns the subject.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

impl User for SubjectUser {
    fn unique_id(&self) -> &[u8] {
        self.subject.as_bytes()
    }
}

/// [`UserExtractor`] that builds a [`SubjectUser`] from the `sub` claim.
pub fn subject_user(claims: &Claims) -> HermesResult<Arc<dyn User>> {
    claims
        .subject()
        .filter(|sub| !sub.is_empty())
        .map(|sub| Arc::new(SubjectUser::new(sub)) as Arc<dyn User>)
        .ok_or_else(|| HermesError::authentication("token has no subject"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug)]
    struct Member {
        id: u64,
        id_bytes: [u8; 8],
        email: String,
    }

    impl Member {
        fn new(id: u64, email: &str) -> Self {
            Self {
                id,
                id_bytes: id.to_be_bytes(),
                email: email.to_string(),
            }
        }
    }

    impl User for Member {
        fn unique_id(&self) -> &[u8] {
            &self.id_bytes
        }
    }

    impl ExtendedUser for Member {
        fn email(&self) -> &str {
            &self.email
        }

        fn display_name(&self) -> HermesResult<String> {
            Ok(format!("member #{}", self.id))
        }

        fn details(&self) -> HashMap<String, String> {
            HashMap::new()
        }
    }

    #[test]
    fn test_subject_user() {
        let claims = Claims::from_value(json!({"sub": "alice"})).unwrap();
        let user = subject_user(&claims).unwrap();
        assert_eq!(user.unique_id(), b"alice");

        let err = subject_user(&Claims::default()).unwrap_err();
        assert_eq!(err.error_code(), "AUTHENTICATION_ERROR");
    }

    #[test]
    fn test_closure_extractor() {
        let extractor = |claims: &Claims| -> HermesResult<Arc<dyn User>> {
            let id = claims
                .get("uid")
                .and_then(serde_json::Value::as_u64)
                .ok_or_else(|| HermesError::authentication("no uid"))?;
            Ok(Arc::new(Member::new(id, "m@example.com")))
        };
        let claims = Claims::from_value(json!({"uid": 7})).unwrap();
        let user = UserExtractor::extract(&extractor, &claims).unwrap();
        assert_eq!(user.unique_id(), &7_u64.to_be_bytes());
    }

    #[test]
    fn test_extended_user() {
        let member = Member::new(3, "m@example.com");
        assert_eq!(member.email(), "m@example.com");
        assert_eq!(member.display_name().unwrap(), "member #3");
    }
}
