//! Built-in middleware stages.
//!
//! The builder composes the first six automatically (see
//! [`pipeline`](crate::pipeline)); [`RequireScopesMiddleware`] and
//! [`ContentNegotiationMiddleware`] are registered per operation as extras.

pub mod error_reporting;
pub mod jwt;
pub mod negotiation;
pub mod request_context;
pub mod scopes;
pub mod tracing;
pub mod user;

pub use error_reporting::ErrorReportingMiddleware;
pub use jwt::JwtClaimsMiddleware;
pub use negotiation::ContentNegotiationMiddleware;
pub use request_context::RequestContextMiddleware;
pub use scopes::{RequireScopesMiddleware, ScopesMiddleware};
pub use tracing::TracingMiddleware;
pub use user::UserMiddleware;
