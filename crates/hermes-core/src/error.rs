//! Error types for Hermes.
//!
//! This module provides [`HermesError`], the single error type that flows
//! through negotiation, codecs, authentication, and the middleware pipeline.
//! Every variant is scoped to one request; none is process-fatal.
//!
//! | Variant | Category | Status |
//! |---|---|---|
//! | `NegotiationFailure` | `Negotiation` | 406 |
//! | `UnregisteredCodec` | `Negotiation` | 406 |
//! | `DecoderNotFound` | `UnsupportedMedia` | 415 |
//! | `UnsupportedPayload` | `Internal` | 500 |
//! | `Encode` | `Internal` | 500 |
//! | `Decode` | `Validation` | 400 |
//! | `Authentication` | `Authentication` | 401 |
//! | `AuthStateMissing` | `Authentication` | 401 |
//! | `AuthorizationDenied` | `Authorization` | 403 |
//! | `Status` | caller-chosen | caller-chosen |
//! | `Internal` | `Internal` | 500 |

use crate::mime::MimeType;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Result type alias using [`HermesError`].
pub type HermesResult<T> = Result<T, HermesError>;

/// Categories of errors for classification and status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// No acceptable representation could be produced.
    Negotiation,
    /// The request body's media type is not supported.
    UnsupportedMedia,
    /// Request validation errors (undecodable body).
    Validation,
    /// Authentication errors (invalid/missing credentials).
    Authentication,
    /// Authorization errors (permission denied).
    Authorization,
    /// Errors raised by handlers with an explicit client status.
    Client,
    /// Internal server errors.
    Internal,
}

impl ErrorCategory {
    /// Returns the default HTTP status code for this error category.
    #[must_use]
    pub const fn default_status_code(&self) -> StatusCode {
        match self {
            Self::Negotiation => StatusCode::NOT_ACCEPTABLE,
            Self::UnsupportedMedia => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Validation | Self::Client => StatusCode::BAD_REQUEST,
            Self::Authentication => StatusCode::UNAUTHORIZED,
            Self::Authorization => StatusCode::FORBIDDEN,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Which piece of authentication state a consumer asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    /// Verified token claims.
    Claims,
    /// The user extracted from claims.
    User,
    /// The scopes extracted from claims.
    Scopes,
}

impl std::fmt::Display for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Claims => "claims",
            Self::User => "user",
            Self::Scopes => "scopes",
        })
    }
}

/// Standard error type for Hermes.
///
/// # Example
///
/// ```
/// use hermes_core::{HermesError, MimeType};
/// use http::StatusCode;
///
/// let err = HermesError::UnregisteredCodec { mime: MimeType::new("text", "csv") };
/// assert_eq!(err.status_code(), StatusCode::NOT_ACCEPTABLE);
/// assert_eq!(err.to_string(), "text/csv isn't a registered codec");
/// ```
#[derive(Error, Debug)]
pub enum HermesError {
    /// Negotiation produced no usable media type.
    ///
    /// Resolution always falls back to `application/octet-stream`, so this is
    /// only raised by callers that opt out of the fallback.
    #[error("no acceptable media type: {message}")]
    NegotiationFailure {
        /// Human-readable error message.
        message: String,
    },

    /// The negotiated media type has no bound codec.
    #[error("{mime} isn't a registered codec")]
    UnregisteredCodec {
        /// The first candidate that could not be served.
        mime: MimeType,
    },

    /// A codec was given a value it cannot serialize.
    #[error("unsupported payload for {codec} encoder")]
    UnsupportedPayload {
        /// The codec that rejected the payload.
        codec: MimeType,
    },

    /// No decoder is registered for a declared content type.
    #[error("decoder could not be found for {content_type:?}")]
    DecoderNotFound {
        /// The declared content type (raw header value).
        content_type: String,
    },

    /// A codec failed while writing.
    #[error("encoding {mime}: {message}")]
    Encode {
        /// The codec's media type.
        mime: MimeType,
        /// Underlying error message.
        message: String,
    },

    /// A codec failed while reading.
    #[error("decoding {mime}: {message}")]
    Decode {
        /// The codec's media type.
        mime: MimeType,
        /// Underlying error message.
        message: String,
    },

    /// Credentials were present but could not be verified.
    #[error("authentication error: {message}")]
    Authentication {
        /// Human-readable error message.
        message: String,
    },

    /// A consumer asked for authentication state that was never set.
    #[error("{state} not found in request state")]
    AuthStateMissing {
        /// The missing piece of state.
        state: AuthState,
    },

    /// The scope guard rejected the request.
    #[error("request is missing these scopes: {}", join(missing))]
    AuthorizationDenied {
        /// The scopes that were required but not granted, sorted.
        missing: BTreeSet<String>,
    },

    /// An error with an explicit HTTP status, raised by handlers.
    #[error("{message}")]
    Status {
        /// The status code to respond with.
        status: StatusCode,
        /// Human-readable error message.
        message: String,
    },

    /// Internal server error.
    #[error("internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
        /// The underlying error (not exposed to clients).
        #[source]
        source: Option<anyhow::Error>,
    },
}

fn join(set: &BTreeSet<String>) -> String {
    set.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

impl HermesError {
    /// Creates a negotiation failure.
    #[must_use]
    pub fn negotiation(message: impl Into<String>) -> Self {
        Self::NegotiationFailure {
            message: message.into(),
        }
    }

    /// Creates an encode error from any displayable cause.
    #[must_use]
    pub fn encode(mime: MimeType, cause: impl std::fmt::Display) -> Self {
        Self::Encode {
            mime,
            message: cause.to_string(),
        }
    }

    /// Creates a decode error from any displayable cause.
    #[must_use]
    pub fn decode(mime: MimeType, cause: impl std::fmt::Display) -> Self {
        Self::Decode {
            mime,
            message: cause.to_string(),
        }
    }

    /// Creates an authentication error.
    #[must_use]
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Creates an authorization denial for the given missing scopes.
    #[must_use]
    pub fn denied<I, S>(missing: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::AuthorizationDenied {
            missing: missing.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates an error carrying an explicit HTTP status.
    #[must_use]
    pub fn status(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an internal error with a source error.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NegotiationFailure { .. } | Self::UnregisteredCodec { .. } => {
                ErrorCategory::Negotiation
            }
            Self::DecoderNotFound { .. } => ErrorCategory::UnsupportedMedia,
            Self::Decode { .. } => ErrorCategory::Validation,
            Self::Authentication { .. } | Self::AuthStateMissing { .. } => {
                ErrorCategory::Authentication
            }
            Self::AuthorizationDenied { .. } => ErrorCategory::Authorization,
            Self::Status { status, .. } if status.is_client_error() => ErrorCategory::Client,
            Self::Status { .. }
            | Self::UnsupportedPayload { .. }
            | Self::Encode { .. }
            | Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Status { status, .. } => *status,
            other => other.category().default_status_code(),
        }
    }

    /// Returns a machine-readable error code.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NegotiationFailure { .. } => "NEGOTIATION_FAILURE",
            Self::UnregisteredCodec { .. } => "UNREGISTERED_CODEC",
            Self::UnsupportedPayload { .. } => "UNSUPPORTED_PAYLOAD",
            Self::DecoderNotFound { .. } => "DECODER_NOT_FOUND",
            Self::Encode { .. } => "ENCODE_ERROR",
            Self::Decode { .. } => "DECODE_ERROR",
            Self::Authentication { .. } => "AUTHENTICATION_ERROR",
            Self::AuthStateMissing { .. } => "AUTH_STATE_MISSING",
            Self::AuthorizationDenied { .. } => "AUTHORIZATION_DENIED",
            Self::Status { .. } => "REQUEST_ERROR",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// Converts this error to a serializable error envelope.
    ///
    /// Internal errors never expose their message or source to clients.
    #[must_use]
    pub fn to_envelope(&self, request_id: Option<&str>) -> ErrorEnvelope {
        let message = match self.category() {
            ErrorCategory::Internal if !matches!(self, Self::Status { .. }) => {
                "An internal error occurred".to_string()
            }
            _ => self.to_string(),
        };
        ErrorEnvelope {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message,
                request_id: request_id.map(ToString::to_string),
            },
        }
    }
}

/// Serializable error envelope returned to clients.
///
/// ```json
/// { "error": { "code": "AUTHORIZATION_DENIED", "message": "...", "request_id": "..." } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename = "response")]
pub struct ErrorEnvelope {
    /// The error details.
    pub error: ErrorDetail,
}

/// The body of an [`ErrorEnvelope`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// The request ID, for support correlation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}
