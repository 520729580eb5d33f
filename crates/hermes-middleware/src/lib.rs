//! # Hermes Middleware
//!
//! Per-operation middleware pipelines for Hermes services.
//!
//! Every request runs through a pipeline composed for its operation:
//!
//! ```text
//! Request → RequestContext → Tracing → ErrorReporting → [JWT → User → Scopes] → extras → Handler
//!                                                                                          ↓
//! Response ← ─────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The outer three stages are always present; the auth stages appear when
//! their collaborators are configured; extras are registered per operation.
//! State flows through a [`RequestState`] owned by the request.
//!
//! ## Example
//!
//! ```
//! use hermes_middleware::{PipelineBuilder, Response, ResponseExt};
//! use http::StatusCode;
//!
//! # tokio_test::block_on(async {
//! let pipelines = PipelineBuilder::new().build();
//! let request = http::Request::builder()
//!     .uri("/ping")
//!     .body(http_body_util::Full::new(bytes::Bytes::new()))
//!     .unwrap();
//!
//! let response = pipelines
//!     .serve("ping", request, |_state, _request| {
//!         Box::pin(async { Ok(Response::text(StatusCode::OK, "pong")) })
//!     })
//!     .await;
//! assert_eq!(response.status(), StatusCode::OK);
//! # });
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod context;
pub mod error_encoder;
pub mod middleware;
pub mod pipeline;
pub mod stages;
pub mod types;

pub use context::{RequestState, REQUEST_ID_HEADER};
pub use error_encoder::{ErrorEncoder, NegotiatingErrorEncoder};
pub use middleware::{BoxFuture, FnMiddleware, Handler, Middleware, Next};
pub use pipeline::{BoxedMiddleware, Pipeline, PipelineBuilder, Pipelines, Stage};
pub use types::{
    body_bytes, content_type, decode_request, encode_response, encode_response_with_status,
    HandlerResult, Request, Response, ResponseExt,
};
