//! Content negotiation over a codec registry.
//!
//! [`ContentNegotiation`] answers two questions for a request:
//!
//! - which encoder should write the response, given the types the operation
//!   produces and the client's `Accept` graph ([`resolve`](ContentNegotiation::resolve))
//! - which decoder should read a body, given its declared `Content-Type`
//!   ([`request_decoder`](ContentNegotiation::request_decoder),
//!   [`response_decoder`](ContentNegotiation::response_decoder))

use crate::codec::{
    byte_encoder, encode_to_vec, Decoder, Encoder, EncoderFactory, Payload, Sink,
};
use crate::graph::TypeGraph;
use crate::registry::CodecRegistry;
use bytes::Bytes;
use hermes_core::{HermesError, HermesResult, MimeType};
use std::sync::Arc;

/// The outcome of response negotiation: a media type and its encoder.
#[derive(Clone)]
pub struct ResponseEncoder {
    mime: MimeType,
    factory: EncoderFactory,
}

impl ResponseEncoder {
    /// Returns the negotiated media type, used as the response `Content-Type`.
    #[must_use]
    pub fn mime(&self) -> &MimeType {
        &self.mime
    }

    /// Returns true if negotiation fell back to `application/octet-stream`.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.mime == MimeType::APPLICATION_OCTET_STREAM
    }

    /// Constructs an encoder over `sink`.
    pub fn encoder<'w>(&self, sink: Sink<'w>) -> Box<dyn Encoder + 'w> {
        (self.factory)(sink)
    }

    /// Encodes `payload` into a new buffer.
    pub fn encode(&self, payload: Payload<'_>) -> HermesResult<Vec<u8>> {
        encode_to_vec(&self.factory, payload)
    }
}

impl std::fmt::Debug for ResponseEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseEncoder")
            .field("mime", &self.mime)
            .finish_non_exhaustive()
    }
}

/// Picks codecs for requests and responses.
///
/// # Example
///
/// ```
/// use hermes_core::MimeType;
/// use hermes_negotiate::{ContentNegotiation, TypeGraph};
///
/// let negotiation = ContentNegotiation::with_defaults();
/// let client = TypeGraph::parse("*/*");
///
/// let encoder = negotiation.resolve(&[MimeType::APPLICATION_XML], &client).unwrap();
/// assert_eq!(encoder.mime(), &MimeType::APPLICATION_XML);
/// ```
#[derive(Debug, Clone)]
pub struct ContentNegotiation {
    registry: Arc<CodecRegistry>,
}

impl ContentNegotiation {
    /// Creates a negotiator over a shared registry.
    #[must_use]
    pub fn new(registry: Arc<CodecRegistry>) -> Self {
        Self { registry }
    }

    /// Creates a negotiator over a registry holding the built-in codecs.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(Arc::new(CodecRegistry::with_defaults()))
    }

    /// Returns the underlying registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<CodecRegistry> {
        &self.registry
    }

    /// Returns the server types acceptable to the client, in preference order.
    ///
    /// When nothing intersects the whole server set is returned, so the
    /// server still answers in a type it can produce.
    #[must_use]
    pub fn candidates(server: &[MimeType], client: &TypeGraph) -> Vec<MimeType> {
        let server = TypeGraph::aggregate(server);
        let available = TypeGraph::intersect(&server, client);
        if available.is_empty() {
            server.walk()
        } else {
            available.walk()
        }
    }

    /// Chooses the response encoder.
    ///
    /// Candidates without a bound encoder are skipped. If none is bound the
    /// error names the most preferred candidate. An empty server set falls
    /// back to `application/octet-stream` with the built-in byte encoder.
    pub fn resolve(&self, server: &[MimeType], client: &TypeGraph) -> HermesResult<ResponseEncoder> {
        let candidates = Self::candidates(server, client);
        let Some(first) = candidates.first() else {
            tracing::debug!("no server types declared, falling back to octet-stream");
            return Ok(ResponseEncoder {
                mime: MimeType::APPLICATION_OCTET_STREAM,
                factory: Arc::new(byte_encoder),
            });
        };

        for mime in &candidates {
            if let Some(factory) = self.registry.encoder(mime) {
                tracing::debug!(mime = %mime, "negotiated response type");
                return Ok(ResponseEncoder {
                    mime: mime.clone(),
                    factory,
                });
            }
        }
        Err(HermesError::UnregisteredCodec { mime: first.clone() })
    }

    /// Chooses a decoder for an inbound request body.
    ///
    /// `accepts` lists the types the operation consumes; `content_type` is
    /// the raw header value. A declared type outside `accepts` yields
    /// [`HermesError::DecoderNotFound`].
    pub fn request_decoder(
        &self,
        accepts: &[MimeType],
        content_type: &str,
        body: Bytes,
    ) -> HermesResult<Box<dyn Decoder>> {
        let server = TypeGraph::aggregate(accepts);
        let sent = TypeGraph::parse(content_type);
        let candidates = TypeGraph::intersect(&server, &sent).walk();
        let Some(first) = candidates.first() else {
            return Err(HermesError::DecoderNotFound {
                content_type: content_type.to_string(),
            });
        };

        for mime in &candidates {
            if let Some(factory) = self.registry.decoder(mime) {
                return Ok(factory(body));
            }
        }
        Err(HermesError::UnregisteredCodec { mime: first.clone() })
    }

    /// Chooses a decoder for a body received from another service.
    pub fn response_decoder(&self, content_type: &str, body: Bytes) -> HermesResult<Box<dyn Decoder>> {
        TypeGraph::parse(content_type)
            .walk()
            .iter()
            .find_map(|mime| self.registry.decoder(mime))
            .map(|factory| factory(body))
            .ok_or_else(|| HermesError::DecoderNotFound {
                content_type: content_type.to_string(),
            })
    }
}

impl Default for ContentNegotiation {
    fn default() -> Self {
        Self::with_defaults()
    }
}
