//! Span creation for pipeline operations.
//!
//! A [`Tracer`] opens one `tracing` span per operation; the pipeline runs
//! every inner stage and the handler inside it. Incoming W3C Trace Context
//! (`traceparent`) is parsed by [`TraceContext`] so spans continue an
//! upstream trace instead of starting a new one.

use hermes_core::RequestContext;
use uuid::Uuid;

/// The W3C Trace Context header for trace propagation.
pub const TRACEPARENT_HEADER: &str = "traceparent";

/// Opens the span an operation runs in.
pub trait Tracer: Send + Sync {
    /// Starts a span for `operation`.
    fn start_span(&self, operation: &str, context: &RequestContext) -> tracing::Span;
}

/// Tracer that records nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl Tracer for NoopTracer {
    fn start_span(&self, _operation: &str, _context: &RequestContext) -> tracing::Span {
        tracing::Span::none()
    }
}

/// Tracer that opens an `info` span carrying request identifiers.
#[derive(Debug, Clone)]
pub struct SpanTracer {
    service_name: String,
}

impl SpanTracer {
    /// Creates a tracer labelling spans with `service_name`.
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    /// Returns the service name.
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}

impl Tracer for SpanTracer {
    fn start_span(&self, operation: &str, context: &RequestContext) -> tracing::Span {
        tracing::info_span!(
            "operation",
            service.name = %self.service_name,
            operation = %operation,
            request_id = %context.request_id(),
            trace_id = context.trace_id().unwrap_or_default(),
            span_id = context.span_id().unwrap_or_default(),
            http.method = context.method().unwrap_or_default(),
            http.path = context.path().unwrap_or_default(),
        )
    }
}

/// Parsed W3C `traceparent` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceContext {
    /// The 128-bit trace ID as a hex string.
    pub trace_id: String,
    /// The parent span ID, when propagated from upstream.
    pub parent_span_id: Option<String>,
    /// Trace flags.
    pub flags: TraceFlags,
}

impl TraceContext {
    /// Starts a new sampled trace with no parent.
    #[must_use]
    pub fn generate() -> Self {
        Self {
            trace_id: new_trace_id(),
            parent_span_id: None,
            flags: TraceFlags::SAMPLED,
        }
    }

    /// Parses a `traceparent` header value.
    ///
    /// Format: `{version}-{trace-id}-{parent-span-id}-{flags}`, for example
    /// `00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let parts: Vec<&str> = value.trim().split('-').collect();
        let [version, trace_id, parent_span_id, flags] = parts.as_slice() else {
            return None;
        };

        if *version != "00" || !is_hex(trace_id, 32) || !is_hex(parent_span_id, 16) {
            return None;
        }
        if !is_hex(flags, 2) {
            return None;
        }

        Some(Self {
            trace_id: (*trace_id).to_string(),
            parent_span_id: Some((*parent_span_id).to_string()),
            flags: TraceFlags(u8::from_str_radix(flags, 16).ok()?),
        })
    }
}

fn is_hex(value: &str, len: usize) -> bool {
    value.len() == len && value.chars().all(|c| c.is_ascii_hexdigit())
}

/// Trace flags from the W3C Trace Context header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceFlags(u8);

impl TraceFlags {
    /// No flags set.
    pub const NONE: Self = Self(0x00);
    /// The trace is sampled.
    pub const SAMPLED: Self = Self(0x01);

    /// Returns true if the sampled flag is set.
    #[must_use]
    pub const fn is_sampled(self) -> bool {
        self.0 & 0x01 != 0
    }
}

/// Generates a 32-hex-digit trace ID.
#[must_use]
pub fn new_trace_id() -> String {
    Uuid::now_v7().simple().to_string()
}

/// Generates a 16-hex-digit span ID.
#[must_use]
pub fn new_span_id() -> String {
    // The low half of a v7 UUID is random.
    let id = Uuid::now_v7().simple().to_string();
    id[16..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_traceparent() {
        let context =
            TraceContext::parse("00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01").unwrap();
        assert_eq!(context.trace_id, "0af7651916cd43dd8448eb211c80319c");
        assert_eq!(context.parent_span_id.as_deref(), Some("b7ad6b7169203331"));
        assert!(context.flags.is_sampled());
    }

    #[test]
    fn test_parse_traceparent_invalid() {
        assert!(TraceContext::parse("01-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01").is_none());
        assert!(TraceContext::parse("00-abc-def-01").is_none());
        assert!(TraceContext::parse("00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-zz").is_none());
        assert!(TraceContext::parse("").is_none());
    }

    #[test]
    fn test_generated_ids() {
        let context = TraceContext::generate();
        assert_eq!(context.trace_id.len(), 32);
        assert!(context.parent_span_id.is_none());
        assert_eq!(new_span_id().len(), 16);
        assert_ne!(new_span_id(), new_span_id());
    }

    #[test]
    fn test_trace_flags() {
        assert!(!TraceFlags::NONE.is_sampled());
        assert!(TraceFlags(0x03).is_sampled());
    }

    #[test]
    fn test_noop_tracer_span_is_disabled() {
        let span = NoopTracer.start_span("getUser", &RequestContext::new());
        assert!(span.is_disabled());
    }

    #[test]
    fn test_span_tracer_builds_span() {
        let tracer = SpanTracer::new("orders");
        let context = RequestContext::new().with_trace_id("abc").with_operation("getOrder");
        let _span = tracer.start_span("getOrder", &context);
        assert_eq!(tracer.service_name(), "orders");
    }
}
