//! Request and response types used throughout the pipeline.

use bytes::Bytes;
use hermes_core::{HermesResult, MimeType};
use hermes_negotiate::codec::{Decoder, Payload};
use hermes_negotiate::{ContentNegotiation, ResponseEncoder};
use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use serde::de::DeserializeOwned;

/// The HTTP request type used in the pipeline.
pub type Request = http::Request<Full<Bytes>>;

/// The HTTP response type used in the pipeline.
pub type Response = http::Response<Full<Bytes>>;

/// What a handler or middleware stage produces.
pub type HandlerResult = HermesResult<Response>;

/// Helpers for building responses.
pub trait ResponseExt {
    /// Creates a response with `status`, `Content-Type: mime` and `body`.
    fn with_body(status: StatusCode, mime: &MimeType, body: impl Into<Bytes>) -> Response;

    /// Creates a plain text response.
    fn text(status: StatusCode, message: &str) -> Response;
}

impl ResponseExt for Response {
    fn with_body(status: StatusCode, mime: &MimeType, body: impl Into<Bytes>) -> Response {
        let mut response = http::Response::new(Full::new(body.into()));
        *response.status_mut() = status;
        if let Ok(value) = HeaderValue::from_str(mime.as_str()) {
            response.headers_mut().insert(CONTENT_TYPE, value);
        }
        response
    }

    fn text(status: StatusCode, message: &str) -> Response {
        let mut response = Self::with_body(status, &MimeType::TEXT_PLAIN, message.to_string());
        response.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }
}

/// Encodes `payload` with a negotiated encoder into a `200 OK` response.
///
/// The response `Content-Type` is the negotiated media type.
pub fn encode_response(encoder: &ResponseEncoder, payload: Payload<'_>) -> HandlerResult {
    encode_response_with_status(encoder, StatusCode::OK, payload)
}

/// Like [`encode_response`] with an explicit status.
pub fn encode_response_with_status(
    encoder: &ResponseEncoder,
    status: StatusCode,
    payload: Payload<'_>,
) -> HandlerResult {
    let body = encoder.encode(payload)?;
    Ok(Response::with_body(status, encoder.mime(), body))
}

/// Returns the raw `Content-Type` header of `request`, or `""`.
#[must_use]
pub fn content_type(request: &Request) -> &str {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

/// Decodes the request body into `T` using the codec for its `Content-Type`.
///
/// `accepts` lists the media types the operation consumes.
pub async fn decode_request<T: DeserializeOwned>(
    negotiation: &ContentNegotiation,
    accepts: &[MimeType],
    request: Request,
) -> HermesResult<T> {
    let content_type = content_type(&request).to_string();
    let body = body_bytes(request).await;
    let mut decoder: Box<dyn Decoder> = negotiation.request_decoder(accepts, &content_type, body)?;
    decoder.decode::<T>()
}

/// Collects the buffered body of a request.
pub async fn body_bytes(request: Request) -> Bytes {
    match request.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(never) => match never {},
    }
}
