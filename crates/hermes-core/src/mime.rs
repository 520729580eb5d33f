//! Canonical media type identifiers.
//!
//! A [`MimeType`] is an immutable `group/subtype` pair in canonical lowercase
//! form, with any media-type parameters (`; charset=utf-8`) stripped. It is
//! the key used by codec registries and the value returned by negotiation.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// The wildcard token for groups and subtypes (`*/*`, `text/*`).
pub const WILDCARD: &str = "*";

/// A canonical `group/subtype` media type.
///
/// # Example
///
/// ```
/// use hermes_core::MimeType;
///
/// let mime: MimeType = "Application/JSON; charset=utf-8".parse().unwrap();
/// assert_eq!(mime, MimeType::APPLICATION_JSON);
/// assert_eq!(mime.group(), "application");
/// assert_eq!(mime.subtype(), "json");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MimeType(Cow<'static, str>);

impl MimeType {
    /// `text/plain`, the default type for human-readable bodies.
    pub const TEXT_PLAIN: Self = Self(Cow::Borrowed("text/plain"));

    /// `application/json`.
    pub const APPLICATION_JSON: Self = Self(Cow::Borrowed("application/json"));

    /// `application/xml`.
    pub const APPLICATION_XML: Self = Self(Cow::Borrowed("application/xml"));

    /// `application/octet-stream`, the reserved negotiation fallback.
    pub const APPLICATION_OCTET_STREAM: Self = Self(Cow::Borrowed("application/octet-stream"));

    /// `application/x-www-form-urlencoded`.
    pub const APPLICATION_FORM_URLENCODED: Self =
        Self(Cow::Borrowed("application/x-www-form-urlencoded"));

    /// Builds a media type from a group and a subtype.
    ///
    /// Both parts are trimmed and lowercased.
    #[must_use]
    pub fn new(group: &str, subtype: &str) -> Self {
        Self(Cow::Owned(format!(
            "{}/{}",
            group.trim().to_ascii_lowercase(),
            subtype.trim().to_ascii_lowercase()
        )))
    }

    /// Parses a media type, ignoring parameters.
    ///
    /// Returns `None` when the value has no `/` or either side is empty.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let essence = value.split(';').next()?.trim();
        let (group, subtype) = essence.split_once('/')?;
        let (group, subtype) = (group.trim(), subtype.trim());
        if group.is_empty() || subtype.is_empty() || subtype.contains('/') {
            return None;
        }
        Some(Self::new(group, subtype))
    }

    /// Returns the canonical `group/subtype` string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the group (top-level type), e.g. `application`.
    #[must_use]
    pub fn group(&self) -> &str {
        self.0.split_once('/').map_or(self.as_str(), |(group, _)| group)
    }

    /// Returns the subtype, e.g. `json`.
    #[must_use]
    pub fn subtype(&self) -> &str {
        self.0.split_once('/').map_or("", |(_, subtype)| subtype)
    }

    /// Returns true if either side is the wildcard.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.group() == WILDCARD || self.subtype() == WILDCARD
    }
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for MimeType {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Error returned when a string is not a `group/subtype` media type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid media type: {0:?}")]
pub struct InvalidMimeType(pub String);

impl FromStr for MimeType {
    type Err = InvalidMimeType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| InvalidMimeType(s.to_string()))
    }
}

impl TryFrom<String> for MimeType {
    type Error = InvalidMimeType;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MimeType> for String {
    fn from(mime: MimeType) -> Self {
        mime.0.into_owned()
    }
}
