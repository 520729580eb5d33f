//! Core middleware trait and types.
//!
//! Every pipeline stage implements [`Middleware`]. A stage receives the
//! request state, the request and a [`Next`] continuation; it may work
//! before and after calling `next.run`, or return early without calling it.
//!
//! # Example
//!
//! ```
//! use hermes_middleware::{BoxFuture, HandlerResult, Middleware, Next, Request, RequestState};
//!
//! struct Audit;
//!
//! impl Middleware for Audit {
//!     fn name(&self) -> &'static str {
//!         "audit"
//!     }
//!
//!     fn process<'a>(
//!         &'a self,
//!         state: &'a mut RequestState,
//!         request: Request,
//!         next: Next<'a>,
//!     ) -> BoxFuture<'a, HandlerResult> {
//!         Box::pin(async move {
//!             tracing::info!(request_id = %state.request_id(), "before");
//!             let result = next.run(state, request).await;
//!             tracing::info!(ok = result.is_ok(), "after");
//!             result
//!         })
//!     }
//! }
//! ```

use crate::context::RequestState;
use crate::types::{HandlerResult, Request};
use std::future::Future;
use std::pin::Pin;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A pipeline stage.
///
/// A stage calls `next.run()` at most once. Returning `Err` aborts the
/// remaining stages; outer stages still see the error on the way out.
pub trait Middleware: Send + Sync + 'static {
    /// Returns the stage name, used in logs.
    fn name(&self) -> &'static str;

    /// Processes the request, usually by delegating to `next`.
    fn process<'a>(
        &'a self,
        state: &'a mut RequestState,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, HandlerResult>;
}

/// The innermost function of a pipeline.
///
/// Any `FnOnce(&mut RequestState, Request) -> BoxFuture<HandlerResult>`
/// closure implements it:
///
/// ```ignore
/// pipeline.process(&mut state, request, |state, _request| {
///     Box::pin(async move {
///         let user = state.user()?;
///         Ok(Response::text(StatusCode::OK, &format!("{user:?}")))
///     })
/// })
/// ```
pub trait Handler: Send {
    /// Runs the handler.
    fn call<'s>(self: Box<Self>, state: &'s mut RequestState, request: Request) -> BoxFuture<'s, HandlerResult>;
}

impl<F> Handler for F
where
    F: for<'s> FnOnce(&'s mut RequestState, Request) -> BoxFuture<'s, HandlerResult> + Send,
{
    fn call<'s>(self: Box<Self>, state: &'s mut RequestState, request: Request) -> BoxFuture<'s, HandlerResult> {
        (*self)(state, request)
    }
}

/// The rest of the pipeline after the current stage.
///
/// Consumed by [`run`](Next::run), so it can be invoked only once.
pub struct Next<'a> {
    inner: NextInner<'a>,
}

enum NextInner<'a> {
    Chain {
        middleware: &'a dyn Middleware,
        next: Box<Next<'a>>,
    },
    Handler(Box<dyn Handler + 'a>),
}

impl<'a> Next<'a> {
    /// Creates a `Next` that runs `middleware` before `next`.
    pub(crate) fn new(middleware: &'a dyn Middleware, next: Next<'a>) -> Self {
        Self {
            inner: NextInner::Chain {
                middleware,
                next: Box::new(next),
            },
        }
    }

    /// Creates a terminal `Next` that runs the handler.
    pub(crate) fn handler<F>(handler: F) -> Self
    where
        F: for<'s> FnOnce(&'s mut RequestState, Request) -> BoxFuture<'s, HandlerResult> + Send + 'a,
    {
        Self {
            inner: NextInner::Handler(Box::new(handler)),
        }
    }

    /// Runs the next stage, or the handler at the end of the chain.
    pub async fn run(self, state: &mut RequestState, request: Request) -> HandlerResult {
        match self.inner {
            NextInner::Chain { middleware, next } => middleware.process(state, request, *next).await,
            NextInner::Handler(handler) => handler.call(state, request).await,
        }
    }
}

/// A middleware built from a closure.
///
/// ```
/// use hermes_middleware::FnMiddleware;
///
/// let stamp = FnMiddleware::new("stamp", |state, request, next| {
///     Box::pin(async move {
///         state.set_extension("stamped");
///         next.run(state, request).await
///     })
/// });
/// # let _ = stamp;
/// ```
pub struct FnMiddleware<F> {
    name: &'static str,
    func: F,
}

impl<F> FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut RequestState, Request, Next<'a>) -> BoxFuture<'a, HandlerResult>
        + Send
        + Sync
        + 'static,
{
    /// Wraps `func` as a stage named `name`.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut RequestState, Request, Next<'a>) -> BoxFuture<'a, HandlerResult>
        + Send
        + Sync
        + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn process<'a>(
        &'a self,
        state: &'a mut RequestState,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, HandlerResult> {
        (self.func)(state, request, next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Response, ResponseExt};
    use bytes::Bytes;
    use hermes_core::HermesError;
    use http::StatusCode;
    use http_body_util::Full;

    struct Visit {
        name: &'static str,
    }

    impl Middleware for Visit {
        fn name(&self) -> &'static str {
            self.name
        }

        fn process<'a>(
            &'a self,
            state: &'a mut RequestState,
            request: Request,
            next: Next<'a>,
        ) -> BoxFuture<'a, HandlerResult> {
            Box::pin(async move {
                let mut visited: Vec<&'static str> = state.remove_extension().unwrap_or_default();
                visited.push(self.name);
                state.set_extension(visited);
                next.run(state, request).await
            })
        }
    }

    fn request() -> Request {
        http::Request::builder()
            .uri("/test")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    fn ok<'s>(_state: &'s mut RequestState, _request: Request) -> BoxFuture<'s, HandlerResult> {
        Box::pin(async { Ok(Response::text(StatusCode::OK, "OK")) })
    }

    #[tokio::test]
    async fn test_next_handler() {
        let mut state = RequestState::new();
        let response = Next::handler(ok).run(&mut state, request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_handler_reads_state() {
        let mut state = RequestState::new();
        state.set_operation("getUser");
        let next = Next::handler(|state, _request| {
            Box::pin(async move {
                let operation = state.operation().unwrap_or_default().to_string();
                Ok(Response::text(StatusCode::OK, &operation))
            })
        });
        assert!(next.run(&mut state, request()).await.is_ok());
    }

    #[tokio::test]
    async fn test_middleware_chain() {
        let first = Visit { name: "first" };
        let second = Visit { name: "second" };
        let mut state = RequestState::new();

        let next = Next::new(&first, Next::new(&second, Next::handler(ok)));
        let response = next.run(&mut state, request()).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            state.get_extension::<Vec<&'static str>>(),
            Some(&vec!["first", "second"])
        );
    }

    #[tokio::test]
    async fn test_fn_middleware_short_circuits() {
        let deny = FnMiddleware::new("deny", |_state, _request, _next| {
            Box::pin(async { Err(HermesError::status(StatusCode::TOO_MANY_REQUESTS, "slow down")) })
        });
        assert_eq!(deny.name(), "deny");

        let mut state = RequestState::new();
        let err = Next::new(&deny, Next::handler(ok))
            .run(&mut state, request())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);
    }
}
