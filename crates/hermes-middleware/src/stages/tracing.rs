//! Tracing stage.
//!
//! Continues the caller's W3C trace when a valid `traceparent` header is
//! present, otherwise starts a new trace. Every inner stage and the handler
//! run inside the span opened by the configured [`Tracer`]. Request count and
//! latency are recorded when the request completes.

use crate::context::RequestState;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{HandlerResult, Request};
use hermes_telemetry::metrics::record_request;
use hermes_telemetry::tracer::{new_span_id, TRACEPARENT_HEADER};
use hermes_telemetry::{NoopTracer, TraceContext, Tracer};
use std::sync::Arc;
use tracing::Instrument;

/// Runs the rest of the pipeline inside a tracer span.
#[derive(Clone)]
pub struct TracingMiddleware {
    tracer: Arc<dyn Tracer>,
}

impl TracingMiddleware {
    /// Creates the stage over `tracer`.
    #[must_use]
    pub fn new(tracer: Arc<dyn Tracer>) -> Self {
        Self { tracer }
    }

    /// Creates a stage that opens no spans but still assigns trace ids.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(Arc::new(NoopTracer))
    }
}

impl std::fmt::Debug for TracingMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TracingMiddleware").finish_non_exhaustive()
    }
}

impl Middleware for TracingMiddleware {
    fn name(&self) -> &'static str {
        "tracing"
    }

    fn process<'a>(
        &'a self,
        state: &'a mut RequestState,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            let trace = state
                .header(TRACEPARENT_HEADER)
                .and_then(TraceContext::parse)
                .unwrap_or_else(TraceContext::generate);
            state.set_trace_id(trace.trace_id);
            state.set_span_id(new_span_id());

            let operation = state.operation().unwrap_or_default().to_string();
            let span = self.tracer.start_span(&operation, &state.to_request_context());
            let result = next.run(state, request).instrument(span).await;

            let status = match &result {
                Ok(response) => response.status(),
                Err(error) => error.status_code(),
            };
            record_request(&operation, status.as_u16(), state.elapsed());
            tracing::debug!(
                operation = %operation,
                request_id = %state.request_id(),
                http.status = status.as_u16(),
                elapsed = ?state.elapsed(),
                "request completed"
            );
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Response, ResponseExt};
    use bytes::Bytes;
    use hermes_core::RequestContext;
    use http::StatusCode;
    use http_body_util::Full;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingTracer {
        started: Mutex<Vec<(String, Option<String>)>>,
    }

    impl Tracer for RecordingTracer {
        fn start_span(&self, operation: &str, context: &RequestContext) -> tracing::Span {
            self.started
                .lock()
                .unwrap()
                .push((operation.to_string(), context.trace_id().map(str::to_string)));
            tracing::Span::none()
        }
    }

    fn ok<'s>(_state: &'s mut RequestState, _request: Request) -> BoxFuture<'s, HandlerResult> {
        Box::pin(async { Ok(Response::text(StatusCode::OK, "ok")) })
    }

    async fn run(tracer: Arc<RecordingTracer>, traceparent: Option<&str>) -> RequestState {
        let mut builder = http::Request::builder();
        if let Some(value) = traceparent {
            builder = builder.header(TRACEPARENT_HEADER, value);
        }
        let request = builder.body(Full::new(Bytes::new())).unwrap();
        let mut state = RequestState::new();
        state.populate(&request, false);
        state.set_operation("listOrders");

        let stage = TracingMiddleware::new(tracer);
        Next::new(&stage, Next::handler(ok))
            .run(&mut state, request)
            .await
            .unwrap();
        state
    }

    #[tokio::test]
    async fn test_continues_incoming_trace() {
        let tracer = Arc::new(RecordingTracer::default());
        let state = run(
            Arc::clone(&tracer),
            Some("00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01"),
        )
        .await;

        assert_eq!(state.trace_id(), Some("0af7651916cd43dd8448eb211c80319c"));
        assert_eq!(state.span_id().map(str::len), Some(16));
        let started = tracer.started.lock().unwrap();
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].0, "listOrders");
        assert_eq!(started[0].1.as_deref(), Some("0af7651916cd43dd8448eb211c80319c"));
    }

    #[tokio::test]
    async fn test_starts_new_trace() {
        let tracer = Arc::new(RecordingTracer::default());
        let state = run(tracer, Some("garbage")).await;
        assert_eq!(state.trace_id().map(str::len), Some(32));
    }
}
