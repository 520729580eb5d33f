//! # Hermes
//!
//! **Content negotiation and per-operation middleware for HTTP services**
//!
//! Hermes sits between a transport and your handlers. For every operation it
//! composes a pipeline that:
//!
//! - Populates request metadata and a request id
//! - Opens a span and reports errors
//! - Verifies bearer tokens and derives the user and granted scopes
//! - Negotiates the response media type against the client's `Accept` header
//! - Renders escaped errors as a JSON or plain-text envelope
//!
//! ## Quick Start
//!
//! ```
//! use hermes::prelude::*;
//! use http::StatusCode;
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct Order {
//!     id: u32,
//! }
//!
//! # tokio_test::block_on(async {
//! let config = ConfigLoader::new()
//!     .with_string("[service]\nname = \"orders\"", "toml")
//!     .unwrap()
//!     .load()
//!     .unwrap();
//!
//! let service = Service::builder(config)
//!     .unwrap()
//!     .negotiate("getOrder")
//!     .build()
//!     .unwrap();
//!
//! let request = http::Request::builder()
//!     .uri("/orders/7")
//!     .header("accept", "application/json")
//!     .body(http_body_util::Full::new(bytes::Bytes::new()))
//!     .unwrap();
//!
//! let response = service
//!     .handle("getOrder", request, |state, _request| {
//!         Box::pin(async move { respond(state, &Order { id: 7 }) })
//!     })
//!     .await;
//! assert_eq!(response.status(), StatusCode::OK);
//! # });
//! ```
//!
//! ## Crates
//!
//! | Crate | Contents |
//! |-------|----------|
//! | [`core`] | `MimeType`, `HermesError`, `RequestId` |
//! | [`negotiate`] | `TypeGraph`, codecs, `ContentNegotiation` |
//! | [`auth`] | Claims, users, scopes, JWT verification |
//! | [`middleware`] | `RequestState`, stages, `Pipelines` |
//! | [`telemetry`] | Logging, tracing and error reporting |
//! | [`config`] | `HermesConfig` and `ConfigLoader` |

#![doc(html_root_url = "https://docs.rs/hermes/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod service;

pub use hermes_auth as auth;
pub use hermes_config as config;
pub use hermes_core as core;
pub use hermes_middleware as middleware;
pub use hermes_negotiate as negotiate;
pub use hermes_telemetry as telemetry;

pub use service::{respond, respond_with_status, Service, ServiceBuilder, ServiceError};

/// Prelude module for convenient imports.
///
/// ```
/// use hermes::prelude::*;
/// ```
pub mod prelude {
    pub use crate::service::{respond, respond_with_status, Service, ServiceBuilder, ServiceError};

    pub use hermes_core::{HermesError, HermesResult, MimeType, RequestId};

    pub use hermes_auth::{Claims, ExtendedUser, Scopes, User};

    pub use hermes_config::{ConfigLoader, HermesConfig};

    pub use hermes_middleware::{
        BoxFuture, FnMiddleware, HandlerResult, Middleware, Next, Request, RequestState, Response,
        ResponseExt,
    };

    pub use hermes_negotiate::codec::Payload;
}
