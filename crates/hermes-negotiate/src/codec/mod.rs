//! Encoders and decoders keyed by media type.
//!
//! Codecs are type-erased so a registry can hold them behind one signature:
//! encoders receive a [`Payload`] (raw bytes or any `serde::Serialize`
//! value) and decoders drive an `erased_serde` deserializer that
//! `decode::<T>()` turns back into a concrete type.
//!
//! | Media type | Encoder | Decoder |
//! |---|---|---|
//! | `application/json` | [`JsonEncoder`] | [`JsonDecoder`] |
//! | `application/xml` | [`XmlEncoder`] | [`XmlDecoder`] |
//! | `application/x-www-form-urlencoded` | [`FormEncoder`] | [`FormDecoder`] |
//! | `text/plain` | [`TextEncoder`] | [`TextDecoder`] |
//! | `application/octet-stream` | [`ByteEncoder`] | - |

mod form;
mod json;
mod raw;
mod text;
mod xml;

pub use self::raw::{byte_encoder, noop_encoder, ByteEncoder, NoopEncoder};
pub use self::form::{form_decoder, form_encoder, FormDecoder, FormEncoder};
pub use self::json::{json_decoder, json_encoder, JsonDecoder, JsonEncoder};
pub use self::text::{text_decoder, text_encoder, TextDecoder, TextEncoder};
pub use self::xml::{xml_decoder, xml_encoder, XmlDecoder, XmlEncoder};

use bytes::Bytes;
use hermes_core::{HermesError, HermesResult};
use serde::de::DeserializeOwned;
use std::io;
use std::sync::Arc;

/// A byte sink an encoder writes into.
pub type Sink<'w> = &'w mut dyn io::Write;

/// Constructs an encoder over a sink.
pub type EncoderFactory = Arc<dyn for<'w> Fn(Sink<'w>) -> Box<dyn Encoder + 'w> + Send + Sync>;

/// Constructs a decoder over a request or response body.
pub type DecoderFactory = Arc<dyn Fn(Bytes) -> Box<dyn Decoder> + Send + Sync>;

/// A value handed to an encoder.
#[derive(Clone, Copy)]
pub enum Payload<'a> {
    /// Raw bytes, written as-is by byte-oriented encoders.
    Bytes(&'a [u8]),
    /// Any serializable value.
    Value(&'a dyn erased_serde::Serialize),
}

impl<'a> Payload<'a> {
    /// Wraps a serializable value.
    pub fn value<T: serde::Serialize>(value: &'a T) -> Self {
        Self::Value(value)
    }

    /// Wraps a byte slice.
    pub const fn bytes(bytes: &'a [u8]) -> Self {
        Self::Bytes(bytes)
    }
}

impl std::fmt::Debug for Payload<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::Value(_) => f.write_str("Value(..)"),
        }
    }
}

/// A stateful writer of one media type.
pub trait Encoder {
    /// Serializes `payload` into the encoder's sink.
    fn encode(&mut self, payload: Payload<'_>) -> HermesResult<()>;
}

/// Callback handed an erased deserializer by [`Decoder::decode_erased`].
pub type DecodeVisitor<'v> =
    dyn FnMut(&mut dyn erased_serde::Deserializer<'_>) -> Result<(), erased_serde::Error> + 'v;

/// A reader of one media type over a buffered body.
pub trait Decoder: Send {
    /// Builds a deserializer over the body and passes it to `visit`.
    ///
    /// Most callers want `decode::<T>()` instead.
    fn decode_erased(&mut self, visit: &mut DecodeVisitor<'_>) -> HermesResult<()>;
}

impl dyn Decoder + '_ {
    /// Decodes the body into `T`.
    pub fn decode<T: DeserializeOwned>(&mut self) -> HermesResult<T> {
        let mut slot = None;
        self.decode_erased(&mut |deserializer| {
            slot = Some(erased_serde::deserialize::<T>(deserializer)?);
            Ok(())
        })?;
        slot.ok_or_else(|| HermesError::internal("decoder finished without producing a value"))
    }
}

impl std::fmt::Debug for dyn Decoder + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Decoder(..)")
    }
}

/// Runs `encoder` over a fresh buffer and returns the bytes written.
pub fn encode_to_vec(factory: &EncoderFactory, payload: Payload<'_>) -> HermesResult<Vec<u8>> {
    let mut buffer = Vec::new();
    {
        let mut encoder = factory(&mut buffer);
        encoder.encode(payload)?;
    }
    Ok(buffer)
}

/// Writes `bytes` to a sink, mapping I/O failures to an encode error.
pub(crate) fn write_all(
    sink: &mut dyn io::Write,
    mime: &hermes_core::MimeType,
    bytes: &[u8],
) -> HermesResult<()> {
    sink.write_all(bytes)
        .map_err(|e| HermesError::encode(mime.clone(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_core::MimeType;
    use serde::{Deserialize, Serialize};
    use std::collections::BTreeMap;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename = "order")]
    struct Order {
        id: u32,
        item: String,
        paid: bool,
    }

    fn order() -> Order {
        Order {
            id: 7,
            item: "espresso beans".to_string(),
            paid: true,
        }
    }

    fn roundtrip<T>(encoder: EncoderFactory, decoder: DecoderFactory, value: &T) -> T
    where
        T: Serialize + DeserializeOwned,
    {
        let bytes = encode_to_vec(&encoder, Payload::value(value)).unwrap();
        let mut decoder = decoder(Bytes::from(bytes));
        decoder.decode::<T>().unwrap()
    }

    #[test]
    fn test_json_roundtrip() {
        let back = roundtrip(Arc::new(json_encoder), Arc::new(json_decoder), &order());
        assert_eq!(back, order());
    }

    #[test]
    fn test_xml_roundtrip() {
        let back = roundtrip(Arc::new(xml_encoder), Arc::new(xml_decoder), &order());
        assert_eq!(back, order());
    }

    #[test]
    fn test_form_roundtrip() {
        let back = roundtrip(Arc::new(form_encoder), Arc::new(form_decoder), &order());
        assert_eq!(back, order());
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Tag {
        v: f64,
        s: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename = "doc")]
    struct Doc {
        name: String,
        n: i32,
        tags: BTreeMap<String, Tag>,
    }

    fn doc() -> Doc {
        let mut tags = BTreeMap::new();
        tags.insert(
            "a".to_string(),
            Tag {
                v: 1.5,
                s: "x".to_string(),
            },
        );
        tags.insert(
            "b".to_string(),
            Tag {
                v: -0.25,
                s: "y z".to_string(),
            },
        );
        Doc {
            name: "nested".to_string(),
            n: -3,
            tags,
        }
    }

    #[test]
    fn test_json_nested_roundtrip() {
        let back = roundtrip(Arc::new(json_encoder), Arc::new(json_decoder), &doc());
        assert_eq!(back, doc());
    }

    #[test]
    fn test_xml_nested_roundtrip() {
        let back = roundtrip(Arc::new(xml_encoder), Arc::new(xml_decoder), &doc());
        assert_eq!(back, doc());
    }

    #[test]
    fn test_form_rejects_nested_values() {
        let encoder: EncoderFactory = Arc::new(form_encoder);
        let err = encode_to_vec(&encoder, Payload::value(&doc())).unwrap_err();
        assert!(matches!(err, HermesError::Encode { mime, .. } if mime == MimeType::APPLICATION_FORM_URLENCODED));
    }

    #[test]
    fn test_decoder_debug_is_opaque() {
        let decoder = json_decoder(Bytes::from_static(b"{}"));
        assert_eq!(format!("{decoder:?}"), "Decoder(..)");
    }

    #[test]
    fn test_text_roundtrip() {
        let text = "hello, world".to_string();
        let back = roundtrip(Arc::new(text_encoder), Arc::new(text_decoder), &text);
        assert_eq!(back, text);
    }

    #[test]
    fn test_decode_error_names_codec() {
        let mut decoder = json_decoder(Bytes::from_static(b"{not json"));
        let err = decoder.decode::<Order>().unwrap_err();
        assert!(matches!(err, HermesError::Decode { mime, .. } if mime == MimeType::APPLICATION_JSON));
    }

    #[test]
    fn test_payload_debug_hides_values() {
        assert_eq!(format!("{:?}", Payload::bytes(b"abc")), "Bytes(3)");
        assert_eq!(format!("{:?}", Payload::value(&1)), "Value(..)");
    }
}
