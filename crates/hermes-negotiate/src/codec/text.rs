use super::{write_all, DecodeVisitor, Decoder, Encoder, Payload, Sink};
use bytes::Bytes;
use hermes_core::{HermesError, HermesResult, MimeType};
use serde::de::value::{Error as ValueError, StrDeserializer};
use serde::de::IntoDeserializer;

/// Writes any payload as plain text.
///
/// Strings are written verbatim, other values in their JSON text form, and
/// byte payloads as lossy UTF-8.
pub struct TextEncoder<'w> {
    sink: Sink<'w>,
}

impl<'w> TextEncoder<'w> {
    /// Creates a text encoder over `sink`.
    pub fn new(sink: Sink<'w>) -> Self {
        Self { sink }
    }
}

impl Encoder for TextEncoder<'_> {
    fn encode(&mut self, payload: Payload<'_>) -> HermesResult<()> {
        let text = match payload {
            Payload::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            Payload::Value(value) => match serde_json::to_value(value)
                .map_err(|e| HermesError::encode(MimeType::TEXT_PLAIN, e))?
            {
                serde_json::Value::String(text) => text,
                other => other.to_string(),
            },
        };
        write_all(&mut *self.sink, &MimeType::TEXT_PLAIN, text.as_bytes())
    }
}

/// Encoder constructor for `text/plain`.
pub fn text_encoder<'w>(sink: Sink<'w>) -> Box<dyn Encoder + 'w> {
    Box::new(TextEncoder::new(sink))
}

/// Reads a UTF-8 body as a single string.
pub struct TextDecoder {
    body: Bytes,
}

impl Decoder for TextDecoder {
    fn decode_erased(&mut self, visit: &mut DecodeVisitor<'_>) -> HermesResult<()> {
        let text = std::str::from_utf8(&self.body)
            .map_err(|e| HermesError::decode(MimeType::TEXT_PLAIN, e))?;
        let deserializer: StrDeserializer<'_, ValueError> = text.into_deserializer();
        visit(&mut <dyn erased_serde::Deserializer>::erase(deserializer))
            .map_err(|e| HermesError::decode(MimeType::TEXT_PLAIN, e))
    }
}

/// Decoder constructor for `text/plain`.
pub fn text_decoder(body: Bytes) -> Box<dyn Decoder> {
    Box::new(TextDecoder { body })
}
