//! Service integration tests.
//!
//! A service is built from configuration text, then driven with requests
//! the way a transport adapter would.

use bytes::Bytes;
use hermes::core::ErrorEnvelope;
use hermes::middleware::{ErrorEncoder, REQUEST_ID_HEADER};
use hermes::prelude::*;
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::json;

const CONFIG: &str = r#"
[service]
name = "orders"
trust_request_id = true

[negotiation]
produces = ["application/json", "application/xml", "text/plain"]

[auth]
enabled = true
jwt_secret = "integration-secret"
algorithm = "HS384"
scopes_claim = "scp"
"#;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename = "order")]
struct Order {
    id: u32,
    item: String,
}

fn service() -> Service {
    let config = ConfigLoader::new().with_string(CONFIG, "toml").unwrap().load().unwrap();
    Service::builder(config)
        .unwrap()
        .negotiate("getOrder")
        .negotiate("createOrder")
        .require_scopes("createOrder", ["orders:write"])
        .build()
        .unwrap()
}

fn token(scopes: &[&str]) -> String {
    encode(
        &Header::new(Algorithm::HS384),
        &json!({"sub": "alice", "scp": scopes, "exp": 4_000_000_000_u64}),
        &EncodingKey::from_secret(b"integration-secret"),
    )
    .unwrap()
}

fn get(accept: &str) -> Request {
    http::Request::builder()
        .uri("/orders/5")
        .header(ACCEPT, accept)
        .body(Full::new(Bytes::new()))
        .unwrap()
}

async fn body(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn get_order<'s>(state: &'s mut RequestState, _request: Request) -> BoxFuture<'s, HandlerResult> {
    Box::pin(async move {
        respond(
            state,
            &Order {
                id: 5,
                item: "tea".to_string(),
            },
        )
    })
}

#[tokio::test]
async fn test_json_when_accepted() {
    let response = service().handle("getOrder", get("application/json"), get_order).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "application/json");
    assert_eq!(body(response).await, r#"{"id":5,"item":"tea"}"#);
}

#[tokio::test]
async fn test_xml_preferred_by_weight() {
    let response = service()
        .handle("getOrder", get("application/json;q=0.4, application/xml"), get_order)
        .await;

    assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "application/xml");
    assert!(body(response).await.contains("<item>tea</item>"));
}

#[tokio::test]
async fn test_wildcard_ties_break_by_type_name() {
    let response = service().handle("getOrder", get("*/*"), get_order).await;

    // Equal weights order by type name, descending.
    assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "text/plain");
    assert_eq!(body(response).await, r#"{"id":5,"item":"tea"}"#);
}

#[tokio::test]
async fn test_unacceptable_type_falls_back_to_produced_types() {
    let response = service().handle("getOrder", get("image/png"), get_order).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "text/plain");
}

#[tokio::test]
async fn test_trusted_request_id_echoed() {
    let request_id = "0191e5a6-7c1d-7b3e-9f00-1234567890ab";
    let mut request = get("application/json");
    request
        .headers_mut()
        .insert(REQUEST_ID_HEADER, request_id.parse().unwrap());

    let response = service().handle("getOrder", request, get_order).await;
    assert_eq!(response.headers().get(REQUEST_ID_HEADER).unwrap(), request_id);
}

fn create(scopes: &[&str], order: &Order) -> Request {
    http::Request::builder()
        .method("POST")
        .uri("/orders")
        .header(ACCEPT, "application/json")
        .header(CONTENT_TYPE, "application/json")
        .header(AUTHORIZATION, format!("Bearer {}", token(scopes)))
        .body(Full::new(Bytes::from(serde_json::to_vec(order).unwrap())))
        .unwrap()
}

#[tokio::test]
async fn test_create_with_required_scope() {
    let service = std::sync::Arc::new(service());
    let decoder = std::sync::Arc::clone(&service);
    let order = Order {
        id: 9,
        item: "coffee".to_string(),
    };

    let response = service
        .handle("createOrder", create(&["orders:read", "orders:write"], &order), move |state, request| {
            Box::pin(async move {
                let order: Order = decoder.decode(&[], request).await?;
                let user = state.user()?;
                assert_eq!(user.unique_id(), b"alice");
                respond_with_status(state, StatusCode::CREATED, &order)
            })
        })
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Order = serde_json::from_str(&body(response).await).unwrap();
    assert_eq!(created, order);
}

#[tokio::test]
async fn test_create_without_required_scope() {
    let order = Order {
        id: 9,
        item: "coffee".to_string(),
    };
    let response = service()
        .handle("createOrder", create(&["orders:read"], &order), |_state, _request| {
            Box::pin(async { Err(HermesError::internal("handler must not run")) })
        })
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let envelope: ErrorEnvelope = serde_json::from_str(&body(response).await).unwrap();
    assert_eq!(envelope.error.message, "request is missing these scopes: orders:write");
}

#[tokio::test]
async fn test_wrong_algorithm_token_is_not_identity() {
    let token = encode(
        &Header::new(Algorithm::HS256),
        &json!({"sub": "mallory", "scp": ["orders:write"], "exp": 4_000_000_000_u64}),
        &EncodingKey::from_secret(b"integration-secret"),
    )
    .unwrap();
    let mut request = get("text/plain");
    request
        .headers_mut()
        .insert(AUTHORIZATION, format!("Bearer {token}").parse().unwrap());

    let response = service()
        .handle("createOrder", request, |_state, _request| {
            Box::pin(async { Ok(Response::text(StatusCode::OK, "created")) })
        })
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body(response).await, "request is missing these scopes: orders:write");
}

struct Teapot;

impl ErrorEncoder for Teapot {
    fn encode(&self, _state: &RequestState, error: &HermesError) -> Response {
        Response::text(StatusCode::IM_A_TEAPOT, error.error_code())
    }
}

#[tokio::test]
async fn test_custom_error_encoder_survives_build() {
    let config = ConfigLoader::new().with_string(CONFIG, "toml").unwrap().load().unwrap();
    let service = Service::builder(config)
        .unwrap()
        .error_encoder(Teapot)
        .build()
        .unwrap();

    let response = service
        .handle("getOrder", get("application/json"), |_state, _request| {
            Box::pin(async { Err(HermesError::internal("boom")) })
        })
        .await;

    assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    assert_eq!(body(response).await, "INTERNAL_ERROR");
}

#[tokio::test]
async fn test_handler_without_negotiation_cannot_respond() {
    let response = service()
        .handle("unregistered", get("application/json"), |state, _request| {
            Box::pin(async move { respond(state, &"hello") })
        })
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let envelope: ErrorEnvelope = serde_json::from_str(&body(response).await).unwrap();
    assert_eq!(envelope.error.message, "An internal error occurred");
}
