//! End-to-end negotiation: header in, encoded bytes out.

use bytes::Bytes;
use hermes_core::{HermesResult, MimeType};
use hermes_negotiate::codec::{Encoder, Payload, Sink};
use hermes_negotiate::{CodecRegistry, ContentNegotiation, TypeGraph};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename = "user")]
struct User {
    id: u64,
    name: String,
}

fn resolve(header: &str, server: &[MimeType]) -> MimeType {
    ContentNegotiation::with_defaults()
        .resolve(server, &TypeGraph::parse(header))
        .unwrap()
        .mime()
        .clone()
}

#[test]
fn test_client_preference_wins_within_server_set() {
    let mime = resolve(
        "text/html, application/json;q=0.9",
        &[MimeType::APPLICATION_JSON, MimeType::TEXT_PLAIN],
    );
    assert_eq!(mime, MimeType::APPLICATION_JSON);
}

#[test]
fn test_full_wildcard_takes_server_type() {
    assert_eq!(resolve("*/*", &[MimeType::APPLICATION_XML]), MimeType::APPLICATION_XML);
}

#[test]
fn test_structured_suffix_matches_base_type() {
    assert_eq!(
        resolve("application/vnd.api+json", &[MimeType::APPLICATION_JSON]),
        MimeType::APPLICATION_JSON
    );
}

#[test]
fn test_structured_suffix_exact_match_wins() {
    let registry = Arc::new(CodecRegistry::with_defaults());
    let vnd = MimeType::new("application", "vnd.api+json");
    registry.register_encoder(vnd.clone(), hermes_negotiate::codec::json_encoder);
    let negotiation = ContentNegotiation::new(registry);
    let server = [vnd.clone(), MimeType::APPLICATION_XML];

    let client = TypeGraph::parse("application/vnd.api+json");
    let matched = TypeGraph::intersect(&TypeGraph::aggregate(&server), &client);
    assert_eq!(matched.walk(), [vnd.clone()]);

    let encoder = negotiation.resolve(&server, &client).unwrap();
    assert_eq!(encoder.mime(), &vnd);
}

#[test]
fn test_encode_then_decode_through_negotiation() {
    let negotiation = ContentNegotiation::with_defaults();
    let user = User {
        id: 42,
        name: "grace".to_string(),
    };

    for mime in [
        MimeType::APPLICATION_JSON,
        MimeType::APPLICATION_XML,
        MimeType::APPLICATION_FORM_URLENCODED,
    ] {
        let encoder = negotiation
            .resolve(&[mime.clone()], &TypeGraph::parse(mime.as_str()))
            .unwrap();
        let body = encoder.encode(Payload::value(&user)).unwrap();

        let mut decoder = negotiation
            .request_decoder(&[mime.clone()], mime.as_str(), Bytes::from(body))
            .unwrap();
        assert_eq!(decoder.decode::<User>().unwrap(), user, "{mime}");
    }
}

struct CsvEncoder<'w> {
    sink: Sink<'w>,
}

impl Encoder for CsvEncoder<'_> {
    fn encode(&mut self, _payload: Payload<'_>) -> HermesResult<()> {
        self.sink
            .write_all(b"id,name\n")
            .map_err(|e| hermes_core::HermesError::encode(MimeType::new("text", "csv"), e))
    }
}

fn csv_encoder<'w>(sink: Sink<'w>) -> Box<dyn Encoder + 'w> {
    Box::new(CsvEncoder { sink })
}

#[test]
fn test_custom_codec_on_shared_registry() {
    let registry = Arc::new(CodecRegistry::with_defaults());
    let negotiation = ContentNegotiation::new(Arc::clone(&registry));
    let csv = MimeType::new("text", "csv");

    let err = negotiation
        .resolve(&[csv.clone()], &TypeGraph::parse("text/csv"))
        .unwrap_err();
    assert_eq!(err.error_code(), "UNREGISTERED_CODEC");

    registry.register_encoder(csv.clone(), csv_encoder);
    let encoder = negotiation
        .resolve(&[csv.clone()], &TypeGraph::parse("text/csv"))
        .unwrap();
    assert_eq!(encoder.encode(Payload::bytes(b"")).unwrap(), b"id,name\n");
}

#[test]
fn test_independent_registries() {
    let plain = ContentNegotiation::new(Arc::new(CodecRegistry::new()));
    let defaults = ContentNegotiation::with_defaults();
    let client = TypeGraph::parse("application/json");

    assert!(plain.resolve(&[MimeType::APPLICATION_JSON], &client).is_err());
    assert!(defaults.resolve(&[MimeType::APPLICATION_JSON], &client).is_ok());
}
