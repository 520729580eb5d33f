//! # Hermes Core
//!
//! Core types shared by every Hermes crate:
//!
//! - [`MimeType`] - Canonical `group/subtype` media type
//! - [`HermesError`] - Standard error type with status mapping
//! - [`RequestContext`] - Read-only per-request metadata for collaborators
//! - [`RequestId`] - UUID v7 request identifier

#![doc(html_root_url = "https://docs.rs/hermes-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod error;
pub mod mime;

pub use context::{RequestContext, RequestId};
pub use error::{AuthState, ErrorCategory, ErrorDetail, ErrorEnvelope, HermesError, HermesResult};
pub use mime::{InvalidMimeType, MimeType};
