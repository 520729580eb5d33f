//! Media type to codec bindings.

use crate::codec::{
    byte_encoder, form_decoder, form_encoder, json_decoder, json_encoder, text_decoder,
    text_encoder, xml_decoder, xml_encoder, Decoder, DecoderFactory, Encoder, EncoderFactory, Sink,
};
use bytes::Bytes;
use hermes_core::MimeType;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Encoder and decoder constructors keyed by canonical media type.
///
/// Registration takes `&self`; bindings sit behind a read-write lock so a
/// registry shared between serving tasks always reads a consistent table.
/// The last registration for a type wins and bindings are never removed.
///
/// # Example
///
/// ```
/// use hermes_core::MimeType;
/// use hermes_negotiate::codec::{json_encoder, Payload};
/// use hermes_negotiate::CodecRegistry;
///
/// let registry = CodecRegistry::new();
/// assert!(registry.encoder(&MimeType::APPLICATION_JSON).is_none());
///
/// registry.register_encoder(MimeType::APPLICATION_JSON, json_encoder);
/// assert!(registry.encoder(&MimeType::APPLICATION_JSON).is_some());
/// ```
pub struct CodecRegistry {
    encoders: RwLock<HashMap<MimeType, EncoderFactory>>,
    decoders: RwLock<HashMap<MimeType, DecoderFactory>>,
}

impl CodecRegistry {
    /// Creates a registry with no bindings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            encoders: RwLock::new(HashMap::new()),
            decoders: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a registry with the built-in codecs bound.
    ///
    /// Encoders: JSON, XML, form, plain text, octet-stream. Decoders: JSON,
    /// XML, form, plain text.
    #[must_use]
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register_encoder(MimeType::APPLICATION_JSON, json_encoder);
        registry.register_encoder(MimeType::APPLICATION_XML, xml_encoder);
        registry.register_encoder(MimeType::TEXT_PLAIN, text_encoder);
        registry.register_encoder(MimeType::APPLICATION_FORM_URLENCODED, form_encoder);
        registry.register_encoder(MimeType::APPLICATION_OCTET_STREAM, byte_encoder);

        registry.register_decoder(MimeType::APPLICATION_JSON, json_decoder);
        registry.register_decoder(MimeType::APPLICATION_XML, xml_decoder);
        registry.register_decoder(MimeType::TEXT_PLAIN, text_decoder);
        registry.register_decoder(MimeType::APPLICATION_FORM_URLENCODED, form_decoder);
        registry
    }

    /// Binds an encoder constructor to `mime`, replacing any previous one.
    pub fn register_encoder<F>(&self, mime: MimeType, factory: F)
    where
        F: for<'w> Fn(Sink<'w>) -> Box<dyn Encoder + 'w> + Send + Sync + 'static,
    {
        tracing::debug!(mime = %mime, "registering encoder");
        self.encoders.write().insert(mime, Arc::new(factory));
    }

    /// Binds a decoder constructor to `mime`, replacing any previous one.
    pub fn register_decoder<F>(&self, mime: MimeType, factory: F)
    where
        F: Fn(Bytes) -> Box<dyn Decoder> + Send + Sync + 'static,
    {
        tracing::debug!(mime = %mime, "registering decoder");
        self.decoders.write().insert(mime, Arc::new(factory));
    }

    /// Returns the encoder constructor bound to `mime`.
    #[must_use]
    pub fn encoder(&self, mime: &MimeType) -> Option<EncoderFactory> {
        self.encoders.read().get(mime).cloned()
    }

    /// Returns the decoder constructor bound to `mime`.
    #[must_use]
    pub fn decoder(&self, mime: &MimeType) -> Option<DecoderFactory> {
        self.decoders.read().get(mime).cloned()
    }

    /// Returns every type with a bound encoder, sorted.
    #[must_use]
    pub fn encoder_types(&self) -> Vec<MimeType> {
        let mut types: Vec<_> = self.encoders.read().keys().cloned().collect();
        types.sort();
        types
    }

    /// Returns every type with a bound decoder, sorted.
    #[must_use]
    pub fn decoder_types(&self) -> Vec<MimeType> {
        let mut types: Vec<_> = self.decoders.read().keys().cloned().collect();
        types.sort();
        types
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("encoders", &self.encoder_types())
            .field("decoders", &self.decoder_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{encode_to_vec, Payload};
    use hermes_core::{HermesError, HermesResult};
    use std::io::Write;

    struct Tagged<'w> {
        sink: Sink<'w>,
        tag: &'static [u8],
    }

    impl Encoder for Tagged<'_> {
        fn encode(&mut self, _payload: Payload<'_>) -> HermesResult<()> {
            self.sink
                .write_all(self.tag)
                .map_err(|e| HermesError::internal_with_source("tagged write", e))
        }
    }

    fn encoder_a<'w>(sink: Sink<'w>) -> Box<dyn Encoder + 'w> {
        Box::new(Tagged { sink, tag: b"A" })
    }

    fn encoder_b<'w>(sink: Sink<'w>) -> Box<dyn Encoder + 'w> {
        Box::new(Tagged { sink, tag: b"B" })
    }

    #[test]
    fn test_defaults() {
        let registry = CodecRegistry::with_defaults();
        assert_eq!(
            registry.encoder_types(),
            vec![
                MimeType::APPLICATION_JSON,
                MimeType::APPLICATION_OCTET_STREAM,
                MimeType::APPLICATION_FORM_URLENCODED,
                MimeType::APPLICATION_XML,
                MimeType::TEXT_PLAIN,
            ]
        );
        assert!(registry.decoder(&MimeType::APPLICATION_OCTET_STREAM).is_none());
        assert_eq!(registry.decoder_types().len(), 4);
    }

    #[test]
    fn test_last_registration_wins() {
        let csv = MimeType::new("text", "csv");
        let registry = CodecRegistry::new();
        registry.register_encoder(csv.clone(), encoder_a);
        registry.register_encoder(csv.clone(), encoder_b);

        let factory = registry.encoder(&csv).unwrap();
        let written = encode_to_vec(&factory, Payload::bytes(b"")).unwrap();
        assert_eq!(written, b"B");
    }

    #[test]
    fn test_lookup_missing() {
        let registry = CodecRegistry::with_defaults();
        assert!(registry.encoder(&MimeType::new("text", "html")).is_none());
    }

    #[test]
    fn test_concurrent_reads_during_registration() {
        let registry = Arc::new(CodecRegistry::with_defaults());
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        assert!(registry.encoder(&MimeType::APPLICATION_JSON).is_some());
                    }
                })
            })
            .collect();
        for i in 0..100 {
            registry.register_encoder(MimeType::new("text", &format!("x-{i}")), encoder_a);
        }
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(registry.encoder_types().len(), 105);
    }
}
