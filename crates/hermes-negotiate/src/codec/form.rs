use super::{write_all, DecodeVisitor, Decoder, Encoder, Payload, Sink};
use bytes::Bytes;
use hermes_core::{HermesError, HermesResult, MimeType};

/// Writes flat structs and maps as `application/x-www-form-urlencoded`.
pub struct FormEncoder<'w> {
    sink: Sink<'w>,
}

impl<'w> FormEncoder<'w> {
    /// Creates a form encoder over `sink`.
    pub fn new(sink: Sink<'w>) -> Self {
        Self { sink }
    }
}

impl Encoder for FormEncoder<'_> {
    fn encode(&mut self, payload: Payload<'_>) -> HermesResult<()> {
        let Payload::Value(value) = payload else {
            return Err(HermesError::UnsupportedPayload {
                codec: MimeType::APPLICATION_FORM_URLENCODED,
            });
        };
        let form = serde_urlencoded::to_string(value)
            .map_err(|e| HermesError::encode(MimeType::APPLICATION_FORM_URLENCODED, e))?;
        write_all(
            &mut *self.sink,
            &MimeType::APPLICATION_FORM_URLENCODED,
            form.as_bytes(),
        )
    }
}

/// Encoder constructor for `application/x-www-form-urlencoded`.
pub fn form_encoder<'w>(sink: Sink<'w>) -> Box<dyn Encoder + 'w> {
    Box::new(FormEncoder::new(sink))
}

/// Reads a url-encoded form body. A body with no pairs is an error.
pub struct FormDecoder {
    body: Bytes,
}

impl Decoder for FormDecoder {
    fn decode_erased(&mut self, visit: &mut DecodeVisitor<'_>) -> HermesResult<()> {
        if form_urlencoded::parse(&self.body).next().is_none() {
            return Err(HermesError::decode(
                MimeType::APPLICATION_FORM_URLENCODED,
                "no values found",
            ));
        }
        let form = serde_urlencoded::Deserializer::new(form_urlencoded::parse(&self.body));
        visit(&mut <dyn erased_serde::Deserializer>::erase(form))
            .map_err(|e| HermesError::decode(MimeType::APPLICATION_FORM_URLENCODED, e))
    }
}

/// Decoder constructor for `application/x-www-form-urlencoded`.
pub fn form_decoder(body: Bytes) -> Box<dyn Decoder> {
    Box::new(FormDecoder { body })
}
