use super::{write_all, DecodeVisitor, Decoder, Encoder, Payload, Sink};
use bytes::Bytes;
use hermes_core::{HermesError, HermesResult, MimeType};

/// Writes structured values as XML.
///
/// The root element takes the value's type name (or its serde `rename`).
/// Raw byte payloads are rejected.
pub struct XmlEncoder<'w> {
    sink: Sink<'w>,
}

impl<'w> XmlEncoder<'w> {
    /// Creates an XML encoder over `sink`.
    pub fn new(sink: Sink<'w>) -> Self {
        Self { sink }
    }
}

impl Encoder for XmlEncoder<'_> {
    fn encode(&mut self, payload: Payload<'_>) -> HermesResult<()> {
        let Payload::Value(value) = payload else {
            return Err(HermesError::UnsupportedPayload {
                codec: MimeType::APPLICATION_XML,
            });
        };
        let document = quick_xml::se::to_string(value)
            .map_err(|e| HermesError::encode(MimeType::APPLICATION_XML, e))?;
        write_all(&mut *self.sink, &MimeType::APPLICATION_XML, document.as_bytes())
    }
}

/// Encoder constructor for `application/xml`.
pub fn xml_encoder<'w>(sink: Sink<'w>) -> Box<dyn Encoder + 'w> {
    Box::new(XmlEncoder::new(sink))
}

/// Reads a UTF-8 XML body.
pub struct XmlDecoder {
    body: Bytes,
}

impl Decoder for XmlDecoder {
    fn decode_erased(&mut self, visit: &mut DecodeVisitor<'_>) -> HermesResult<()> {
        let text = std::str::from_utf8(&self.body)
            .map_err(|e| HermesError::decode(MimeType::APPLICATION_XML, e))?;
        let mut xml = quick_xml::de::Deserializer::from_str(text);
        visit(&mut <dyn erased_serde::Deserializer>::erase(&mut xml))
            .map_err(|e| HermesError::decode(MimeType::APPLICATION_XML, e))
    }
}

/// Decoder constructor for `application/xml`.
pub fn xml_decoder(body: Bytes) -> Box<dyn Decoder> {
    Box::new(XmlDecoder { body })
}
