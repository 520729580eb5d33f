//! Request-context stage.
//!
//! Always the outermost stage. It records request metadata in the
//! [`RequestState`] (method, uri, host, headers, cookies, accept graph,
//! content type, request id) and names the operation being served. The
//! request id is echoed on successful responses as `X-Request-Id`.

use crate::context::{RequestState, REQUEST_ID_HEADER};
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{HandlerResult, Request};
use http::HeaderValue;
use std::sync::Arc;

/// Seeds the request state.
#[derive(Debug, Clone)]
pub struct RequestContextMiddleware {
    operation: Arc<str>,
    trust_request_id: bool,
}

impl RequestContextMiddleware {
    /// Creates the stage for `operation`.
    ///
    /// Incoming `X-Request-Id` headers are ignored unless
    /// [`trust_request_id`](Self::trust_request_id) is set.
    #[must_use]
    pub fn new(operation: impl Into<Arc<str>>) -> Self {
        Self {
            operation: operation.into(),
            trust_request_id: false,
        }
    }

    /// Adopts a UUID from `X-Request-Id` instead of generating one.
    ///
    /// Enable for traffic from trusted upstream services only.
    #[must_use]
    pub fn trust_request_id(mut self, trust: bool) -> Self {
        self.trust_request_id = trust;
        self
    }
}

impl Middleware for RequestContextMiddleware {
    fn name(&self) -> &'static str {
        "request_context"
    }

    fn process<'a>(
        &'a self,
        state: &'a mut RequestState,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            state.populate(&request, self.trust_request_id);
            state.set_operation(&*self.operation);

            let mut response = next.run(state, request).await?;
            if let Ok(value) = HeaderValue::from_str(&state.request_id().to_string()) {
                response.headers_mut().insert(REQUEST_ID_HEADER, value);
            }
            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Response, ResponseExt};
    use bytes::Bytes;
    use http::StatusCode;
    use http_body_util::Full;

    fn request(request_id: Option<&str>) -> Request {
        let mut builder = http::Request::builder().uri("/orders/7");
        if let Some(id) = request_id {
            builder = builder.header(REQUEST_ID_HEADER, id);
        }
        builder.body(Full::new(Bytes::new())).unwrap()
    }

    fn ok<'s>(state: &'s mut RequestState, _request: Request) -> BoxFuture<'s, HandlerResult> {
        Box::pin(async move {
            assert!(state.is_populated());
            Ok(Response::text(StatusCode::OK, state.path()))
        })
    }

    #[tokio::test]
    async fn test_populates_and_echoes_request_id() {
        let stage = RequestContextMiddleware::new("getOrder");
        let mut state = RequestState::new();
        let response = Next::new(&stage, Next::handler(ok))
            .run(&mut state, request(None))
            .await
            .unwrap();

        assert_eq!(state.operation(), Some("getOrder"));
        assert_eq!(state.path(), "/orders/7");
        assert_eq!(
            response.headers().get(REQUEST_ID_HEADER).unwrap(),
            state.request_id().to_string().as_str()
        );
    }

    #[tokio::test]
    async fn test_trusted_request_id_echoed() {
        let id = "01890a5d-ac96-774b-bcce-b302099a8057";
        let stage = RequestContextMiddleware::new("getOrder").trust_request_id(true);
        let mut state = RequestState::new();
        let response = Next::new(&stage, Next::handler(ok))
            .run(&mut state, request(Some(id)))
            .await
            .unwrap();

        assert_eq!(response.headers().get(REQUEST_ID_HEADER).unwrap(), id);
    }

    #[tokio::test]
    async fn test_untrusted_request_id_replaced() {
        let id = "01890a5d-ac96-774b-bcce-b302099a8057";
        let stage = RequestContextMiddleware::new("getOrder");
        let mut state = RequestState::new();
        let response = Next::new(&stage, Next::handler(ok))
            .run(&mut state, request(Some(id)))
            .await
            .unwrap();

        assert_ne!(response.headers().get(REQUEST_ID_HEADER).unwrap(), id);
    }
}
