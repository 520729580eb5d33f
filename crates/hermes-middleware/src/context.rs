//! Per-request state.
//!
//! [`RequestState`] travels through every stage of a pipeline and into the
//! handler. The request-context stage fills in request metadata once; the
//! tracing stage adds trace identifiers; the auth stages record claims, user
//! and scopes as [`AuthOutcome`]s. Handlers and later stages read it.

use hermes_auth::{parse_basic_auth, AuthOutcome, BasicCredentials, Claims, Scopes, User};
use hermes_core::{AuthState, HermesError, HermesResult, MimeType, RequestContext, RequestId};
use hermes_negotiate::{ResponseEncoder, TypeGraph};
use http::header::{HeaderMap, HeaderName, ACCEPT, AUTHORIZATION, CONTENT_TYPE, COOKIE, HOST, REFERER, USER_AGENT};
use http::{Method, Uri};
use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use crate::types::Request;

/// The header carrying a caller-assigned request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// State owned by one request's execution.
///
/// # Example
///
/// ```
/// use hermes_middleware::RequestState;
///
/// #[derive(Debug, PartialEq)]
/// struct Tenant(&'static str);
///
/// let mut state = RequestState::new();
/// state.set_extension(Tenant("acme"));
/// assert_eq!(state.get_extension::<Tenant>(), Some(&Tenant("acme")));
/// assert!(state.user().is_err());
/// ```
pub struct RequestState {
    request_id: RequestId,
    populated: bool,
    method: Method,
    uri: Uri,
    host: Option<String>,
    headers: HeaderMap,
    cookies: BTreeMap<String, String>,
    accepts: TypeGraph,
    content_type: Option<MimeType>,

    trace_id: Option<String>,
    span_id: Option<String>,
    operation: Option<String>,

    claims: AuthOutcome<Claims>,
    user: AuthOutcome<Arc<dyn User>>,
    scopes: AuthOutcome<Scopes>,

    response_encoder: Option<ResponseEncoder>,
    started_at: Instant,
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl RequestState {
    /// Creates empty state with a fresh request id.
    #[must_use]
    pub fn new() -> Self {
        Self {
            request_id: RequestId::new(),
            populated: false,
            method: Method::GET,
            uri: Uri::default(),
            host: None,
            headers: HeaderMap::new(),
            cookies: BTreeMap::new(),
            accepts: TypeGraph::new(),
            content_type: None,
            trace_id: None,
            span_id: None,
            operation: None,
            claims: AuthOutcome::NotAttempted,
            user: AuthOutcome::NotAttempted,
            scopes: AuthOutcome::NotAttempted,
            response_encoder: None,
            started_at: Instant::now(),
            extensions: HashMap::new(),
        }
    }

    /// Records the metadata of `request`.
    ///
    /// Only the first call has any effect. With `trust_request_id` a UUID in
    /// `X-Request-Id` is adopted as the request id; anything else keeps the
    /// generated one.
    pub fn populate(&mut self, request: &Request, trust_request_id: bool) {
        if self.populated {
            tracing::debug!(request_id = %self.request_id, "request metadata already recorded");
            return;
        }
        self.populated = true;

        let headers = request.headers();
        if trust_request_id {
            if let Some(id) = header_str(headers, REQUEST_ID_HEADER).and_then(RequestId::parse) {
                self.request_id = id;
            }
        }

        self.method = request.method().clone();
        self.uri = request.uri().clone();
        self.host = header_str(headers, HOST.as_str())
            .or_else(|| request.uri().host())
            .map(str::to_string);
        self.cookies = parse_cookies(headers);
        let accept: Vec<&str> = headers
            .get_all(ACCEPT)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect();
        self.accepts = TypeGraph::parse(&accept.join(","));
        self.content_type = header_str(headers, CONTENT_TYPE.as_str()).and_then(MimeType::parse);
        self.headers = headers.clone();
    }

    /// Returns true once request metadata has been recorded.
    #[must_use]
    pub fn is_populated(&self) -> bool {
        self.populated
    }

    /// Returns the request id.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the request path.
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Returns the `Host` header, or the URI authority.
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Returns the request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        header_str(&self.headers, name)
    }

    /// Returns `X-Forwarded-For`.
    #[must_use]
    pub fn forwarded_for(&self) -> Option<&str> {
        self.header(X_FORWARDED_FOR)
    }

    /// Returns `X-Forwarded-Proto`.
    #[must_use]
    pub fn forwarded_proto(&self) -> Option<&str> {
        self.header(X_FORWARDED_PROTO)
    }

    /// Returns `Referer`.
    #[must_use]
    pub fn referer(&self) -> Option<&str> {
        self.header(REFERER.as_str())
    }

    /// Returns `User-Agent`.
    #[must_use]
    pub fn user_agent(&self) -> Option<&str> {
        self.header(USER_AGENT.as_str())
    }

    /// Returns the raw `Authorization` header.
    #[must_use]
    pub fn authorization(&self) -> Option<&str> {
        self.header(AUTHORIZATION.as_str())
    }

    /// Decodes `Authorization: Basic` credentials.
    #[must_use]
    pub fn basic_auth(&self) -> Option<BasicCredentials> {
        self.authorization().and_then(parse_basic_auth)
    }

    /// Returns a cookie value by name.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Returns all cookies.
    #[must_use]
    pub fn cookies(&self) -> &BTreeMap<String, String> {
        &self.cookies
    }

    /// Returns the client's parsed `Accept` graph.
    #[must_use]
    pub fn accepts(&self) -> &TypeGraph {
        &self.accepts
    }

    /// Returns the declared body type, parameters stripped.
    #[must_use]
    pub fn content_type(&self) -> Option<&MimeType> {
        self.content_type.as_ref()
    }

    /// Returns the trace id.
    #[must_use]
    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }

    /// Sets the trace id.
    pub fn set_trace_id(&mut self, trace_id: impl Into<String>) {
        self.trace_id = Some(trace_id.into());
    }

    /// Returns the span id.
    #[must_use]
    pub fn span_id(&self) -> Option<&str> {
        self.span_id.as_deref()
    }

    /// Sets the span id.
    pub fn set_span_id(&mut self, span_id: impl Into<String>) {
        self.span_id = Some(span_id.into());
    }

    /// Returns the operation being served.
    #[must_use]
    pub fn operation(&self) -> Option<&str> {
        self.operation.as_deref()
    }

    /// Sets the operation being served.
    pub fn set_operation(&mut self, operation: impl Into<String>) {
        self.operation = Some(operation.into());
    }

    /// Returns the verified claims.
    pub fn claims(&self) -> HermesResult<&Claims> {
        self.claims.present().ok_or_else(|| HermesError::AuthStateMissing {
            state: AuthState::Claims,
        })
    }

    /// Returns how claim verification went.
    #[must_use]
    pub fn claims_outcome(&self) -> &AuthOutcome<Claims> {
        &self.claims
    }

    /// Records the claim verification outcome.
    pub fn set_claims(&mut self, outcome: AuthOutcome<Claims>) {
        self.claims = outcome;
    }

    /// Returns the extracted user.
    pub fn user(&self) -> HermesResult<&Arc<dyn User>> {
        self.user.present().ok_or_else(|| HermesError::AuthStateMissing {
            state: AuthState::User,
        })
    }

    /// Returns how user extraction went.
    #[must_use]
    pub fn user_outcome(&self) -> &AuthOutcome<Arc<dyn User>> {
        &self.user
    }

    /// Records the user extraction outcome.
    pub fn set_user(&mut self, outcome: AuthOutcome<Arc<dyn User>>) {
        self.user = outcome;
    }

    /// Returns the granted scopes.
    pub fn scopes(&self) -> HermesResult<&Scopes> {
        self.scopes.present().ok_or_else(|| HermesError::AuthStateMissing {
            state: AuthState::Scopes,
        })
    }

    /// Returns how scope extraction went.
    #[must_use]
    pub fn scopes_outcome(&self) -> &AuthOutcome<Scopes> {
        &self.scopes
    }

    /// Records the scope extraction outcome.
    pub fn set_scopes(&mut self, outcome: AuthOutcome<Scopes>) {
        self.scopes = outcome;
    }

    /// Returns the negotiated response encoder, if negotiation ran.
    #[must_use]
    pub fn response_encoder(&self) -> Option<&ResponseEncoder> {
        self.response_encoder.as_ref()
    }

    /// Stores the negotiated response encoder.
    pub fn set_response_encoder(&mut self, encoder: ResponseEncoder) {
        self.response_encoder = Some(encoder);
    }

    /// Returns when the request started.
    #[must_use]
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Returns the time since the request started.
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }

    /// Stores a typed extension value, replacing any of the same type.
    pub fn set_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Returns a typed extension value.
    #[must_use]
    pub fn get_extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    /// Returns a mutable typed extension value.
    pub fn get_extension_mut<T: Send + Sync + 'static>(&mut self) -> Option<&mut T> {
        self.extensions
            .get_mut(&TypeId::of::<T>())
            .and_then(|v| v.downcast_mut())
    }

    /// Removes and returns a typed extension value.
    pub fn remove_extension<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast().ok())
            .map(|b| *b)
    }

    /// Returns true if an extension of type `T` is stored.
    #[must_use]
    pub fn has_extension<T: Send + Sync + 'static>(&self) -> bool {
        self.extensions.contains_key(&TypeId::of::<T>())
    }

    /// Snapshots the identifiers collaborators need.
    #[must_use]
    pub fn to_request_context(&self) -> RequestContext {
        let mut ctx = RequestContext::with_request_id(self.request_id)
            .with_started_at(self.started_at)
            .with_method(self.method.as_str())
            .with_path(self.path());
        if let Some(trace_id) = &self.trace_id {
            ctx = ctx.with_trace_id(trace_id.clone());
        }
        if let Some(span_id) = &self.span_id {
            ctx = ctx.with_span_id(span_id.clone());
        }
        if let Some(operation) = &self.operation {
            ctx = ctx.with_operation(operation.clone());
        }
        ctx
    }
}

impl Default for RequestState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RequestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestState")
            .field("request_id", &self.request_id)
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("operation", &self.operation)
            .field("claims", &self.claims.label())
            .field("user", &self.user.label())
            .field("scopes", &self.scopes.label())
            .finish_non_exhaustive()
    }
}

fn header_str<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    let name = HeaderName::from_bytes(name.as_bytes()).ok()?;
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Parses every `Cookie` header into name/value pairs.
///
/// Later duplicates win; pairs without `=` are skipped.
fn parse_cookies(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            let value = value.trim().trim_matches('"');
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}
