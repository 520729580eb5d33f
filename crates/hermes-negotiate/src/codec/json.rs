use super::{write_all, DecodeVisitor, Decoder, Encoder, Payload, Sink};
use bytes::Bytes;
use hermes_core::{HermesError, HermesResult, MimeType};

/// Writes payloads as JSON.
pub struct JsonEncoder<'w> {
    sink: Sink<'w>,
}

impl<'w> JsonEncoder<'w> {
    /// Creates a JSON encoder over `sink`.
    pub fn new(sink: Sink<'w>) -> Self {
        Self { sink }
    }
}

impl Encoder for JsonEncoder<'_> {
    fn encode(&mut self, payload: Payload<'_>) -> HermesResult<()> {
        let body = match payload {
            Payload::Value(value) => serde_json::to_vec(value),
            Payload::Bytes(bytes) => serde_json::to_vec(bytes),
        }
        .map_err(|e| HermesError::encode(MimeType::APPLICATION_JSON, e))?;
        write_all(&mut *self.sink, &MimeType::APPLICATION_JSON, &body)
    }
}

/// Encoder constructor for `application/json`.
pub fn json_encoder<'w>(sink: Sink<'w>) -> Box<dyn Encoder + 'w> {
    Box::new(JsonEncoder::new(sink))
}

/// Reads a JSON body. Trailing non-whitespace is rejected.
pub struct JsonDecoder {
    body: Bytes,
}

impl Decoder for JsonDecoder {
    fn decode_erased(&mut self, visit: &mut DecodeVisitor<'_>) -> HermesResult<()> {
        let mut json = serde_json::Deserializer::from_slice(&self.body);
        visit(&mut <dyn erased_serde::Deserializer>::erase(&mut json))
            .map_err(|e| HermesError::decode(MimeType::APPLICATION_JSON, e))?;
        json.end()
            .map_err(|e| HermesError::decode(MimeType::APPLICATION_JSON, e))
    }
}

/// Decoder constructor for `application/json`.
pub fn json_decoder(body: Bytes) -> Box<dyn Decoder> {
    Box::new(JsonDecoder { body })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_value() {
        let mut out = Vec::new();
        JsonEncoder::new(&mut out)
            .encode(Payload::value(&json!({"id": 1})))
            .unwrap();
        assert_eq!(out, br#"{"id":1}"#);
    }

    #[test]
    fn test_trailing_garbage_rejected() {
        let mut decoder = json_decoder(Bytes::from_static(b"{\"id\":1} x"));
        assert!(decoder.decode::<serde_json::Value>().is_err());
    }
}
