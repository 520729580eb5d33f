//! Rendering pipeline errors as responses.

use crate::context::RequestState;
use crate::types::{Response, ResponseExt};
use hermes_core::{HermesError, MimeType};
use hermes_negotiate::codec::Payload;
use hermes_negotiate::ContentNegotiation;

/// Turns an error that escaped the pipeline into a response.
///
/// Implementations must not fail; when the preferred representation cannot
/// be produced they degrade to plain text.
pub trait ErrorEncoder: Send + Sync {
    /// Renders `error` for the request described by `state`.
    fn encode(&self, state: &RequestState, error: &HermesError) -> Response;
}

/// Negotiates the error representation with the client.
///
/// The envelope is written in the client's preferred type among those
/// configured (JSON and plain text by default); a request without `Accept`
/// gets the first configured type. Plain text carries only the envelope
/// message.
#[derive(Debug, Clone)]
pub struct NegotiatingErrorEncoder {
    negotiation: ContentNegotiation,
    produces: Vec<MimeType>,
}

impl NegotiatingErrorEncoder {
    /// Creates an encoder offering JSON and plain text.
    #[must_use]
    pub fn new(negotiation: ContentNegotiation) -> Self {
        Self {
            negotiation,
            produces: vec![MimeType::APPLICATION_JSON, MimeType::TEXT_PLAIN],
        }
    }

    /// Replaces the offered types.
    #[must_use]
    pub fn with_types(mut self, produces: Vec<MimeType>) -> Self {
        self.produces = produces;
        self
    }

    fn negotiated(&self, state: &RequestState, error: &HermesError) -> Option<Response> {
        // Without client preferences the first configured type wins.
        let offered = if state.accepts().is_empty() {
            &self.produces[..self.produces.len().min(1)]
        } else {
            &self.produces[..]
        };
        let encoder = self
            .negotiation
            .resolve(offered, state.accepts())
            .map_err(|e| tracing::debug!(error = %e, "error representation not negotiable"))
            .ok()?;

        let envelope = error.to_envelope(Some(&state.request_id().to_string()));
        let body = if encoder.mime() == &MimeType::TEXT_PLAIN {
            encoder.encode(Payload::value(&envelope.error.message))
        } else {
            encoder.encode(Payload::value(&envelope))
        };
        match body {
            Ok(body) => Some(Response::with_body(error.status_code(), encoder.mime(), body)),
            Err(e) => {
                tracing::warn!(mime = %encoder.mime(), error = %e, "failed to encode error envelope");
                None
            }
        }
    }
}

impl Default for NegotiatingErrorEncoder {
    fn default() -> Self {
        Self::new(ContentNegotiation::with_defaults())
    }
}

impl ErrorEncoder for NegotiatingErrorEncoder {
    fn encode(&self, state: &RequestState, error: &HermesError) -> Response {
        self.negotiated(state, error).unwrap_or_else(|| {
            let envelope = error.to_envelope(None);
            Response::text(error.status_code(), &envelope.error.message)
        })
    }
}
