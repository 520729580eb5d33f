//! Response-type negotiation stage.

use crate::context::RequestState;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{HandlerResult, Request};
use hermes_core::MimeType;
use hermes_negotiate::ContentNegotiation;
use hermes_telemetry::metrics::record_negotiated;

/// Resolves the response encoder before the handler runs.
///
/// The negotiated encoder is stored in the request state for the handler
/// (see [`RequestState::response_encoder`]). When no produced type has a
/// bound encoder the request is aborted with `UnregisteredCodec`.
#[derive(Debug, Clone)]
pub struct ContentNegotiationMiddleware {
    negotiation: ContentNegotiation,
    produces: Vec<MimeType>,
}

impl ContentNegotiationMiddleware {
    /// Creates the stage for an operation producing `produces`.
    #[must_use]
    pub fn new(negotiation: ContentNegotiation, produces: Vec<MimeType>) -> Self {
        Self {
            negotiation,
            produces,
        }
    }

    /// Returns the types the operation produces.
    #[must_use]
    pub fn produces(&self) -> &[MimeType] {
        &self.produces
    }
}

impl Middleware for ContentNegotiationMiddleware {
    fn name(&self) -> &'static str {
        "content_negotiation"
    }

    fn process<'a>(
        &'a self,
        state: &'a mut RequestState,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            let encoder = self.negotiation.resolve(&self.produces, state.accepts())?;
            record_negotiated(encoder.mime().as_str());
            tracing::debug!(
                request_id = %state.request_id(),
                mime = %encoder.mime(),
                "response type negotiated"
            );
            state.set_response_encoder(encoder);
            next.run(state, request).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{encode_response, Response, ResponseExt};
    use bytes::Bytes;
    use hermes_core::{HermesError, HermesResult};
    use hermes_negotiate::codec::Payload;
    use hermes_negotiate::CodecRegistry;
    use http::header::{ACCEPT, CONTENT_TYPE};
    use http::StatusCode;
    use http_body_util::Full;
    use std::sync::Arc;

    fn state_accepting(accept: &str) -> (RequestState, Request) {
        let request = http::Request::builder()
            .header(ACCEPT, accept)
            .body(Full::new(Bytes::new()))
            .unwrap();
        let mut state = RequestState::new();
        state.populate(&request, false);
        (state, request)
    }

    fn encode_items<'s>(state: &'s mut RequestState, _request: Request) -> BoxFuture<'s, HandlerResult> {
        Box::pin(async move {
            let encoder = state
                .response_encoder()
                .ok_or_else(|| HermesError::internal("negotiation did not run"))?;
            encode_response(encoder, Payload::value(&vec!["a", "b"]))
        })
    }

    async fn run(stage: &ContentNegotiationMiddleware, accept: &str) -> HermesResult<Response> {
        let (mut state, request) = state_accepting(accept);
        Next::new(stage, Next::handler(encode_items))
            .run(&mut state, request)
            .await
    }

    #[tokio::test]
    async fn test_negotiated_type_reaches_handler() {
        let stage = ContentNegotiationMiddleware::new(
            ContentNegotiation::with_defaults(),
            vec![MimeType::APPLICATION_JSON, MimeType::TEXT_PLAIN],
        );
        let response = run(&stage, "text/plain;q=0.5, application/json").await.unwrap();
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "application/json");
    }

    #[tokio::test]
    async fn test_aborts_without_bound_encoder() {
        let stage = ContentNegotiationMiddleware::new(
            ContentNegotiation::new(Arc::new(CodecRegistry::new())),
            vec![MimeType::APPLICATION_JSON],
        );
        let err = run(&stage, "application/json").await.unwrap_err();
        assert_eq!(err.error_code(), "UNREGISTERED_CODEC");
    }

    #[tokio::test]
    async fn test_handler_never_runs_after_abort() {
        let stage = ContentNegotiationMiddleware::new(
            ContentNegotiation::new(Arc::new(CodecRegistry::new())),
            vec![MimeType::new("text", "csv")],
        );
        let (mut state, request) = state_accepting("text/csv");
        let result = Next::new(&stage, Next::handler(|_state, _request| {
            Box::pin(async { Ok(Response::text(StatusCode::OK, "unreachable")) })
        }))
        .run(&mut state, request)
        .await;
        assert!(result.is_err());
        assert!(state.response_encoder().is_none());
    }
}
