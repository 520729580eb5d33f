//! # Hermes Auth
//!
//! Authentication state carried through a Hermes pipeline:
//!
//! - [`Claims`] - Verified token payload
//! - [`AuthOutcome`] - Present / failed / not-attempted record of an extraction
//! - [`TokenVerifier`] and [`JwtParser`] - Bearer token verification
//! - [`User`], [`UserExtractor`] - Identity derived from claims
//! - [`ScopesExtractor`], [`ClaimScopes`], [`authorize`] - Scope-based access
//! - [`parse_basic_auth`] - HTTP Basic credentials
//!
//! Extraction is fail-open: a stage that cannot derive a user or scopes
//! records the failure and lets the request continue. Only the scope guard
//! rejects requests.

#![doc(html_root_url = "https://docs.rs/hermes-auth/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod basic;
mod claims;
pub mod jwt;
mod outcome;
mod scopes;
mod user;

pub use basic::{parse_basic_auth, BasicCredentials};
pub use claims::Claims;
pub use jwt::{bearer_token, JwtParser, KeyResolver, StaticKey, TokenVerifier};
pub use outcome::AuthOutcome;
pub use scopes::{authorize, missing_scopes, ClaimScopes, Scopes, ScopesExtractor};
pub use user::{subject_user, ExtendedUser, SubjectUser, User, UserExtractor};
