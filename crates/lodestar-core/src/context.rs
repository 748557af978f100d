//! The request carrier.
//!
//! A [`Request`] is built once by the host, enriched by the dispatcher with
//! the matched path parameters and resolved principal, and then shared
//! read-only with middleware and handlers. Cloning is cheap.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use http::{Extensions, HeaderMap, Method, Uri};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::principal::Principal;
use crate::session::Session;
use crate::Params;

/// A unique identifier for each request, using UUID v7.
///
/// UUID v7 is time-ordered, so ids sort by arrival and line up with log
/// timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a fresh id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Wraps an existing UUID, e.g. one propagated in a header.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone)]
struct Inner {
    id: RequestId,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    params: Params,
    session: Option<Arc<dyn Session>>,
    principal: Option<Principal>,
    // Shared across clones so before-middleware can hand values to the handler.
    extensions: Arc<Mutex<Extensions>>,
}

/// An inbound request as seen by middleware and handlers.
///
/// # Example
///
/// ```
/// use lodestar_core::Request;
/// use http::{Method, Uri};
///
/// let request = Request::builder(Method::GET, Uri::from_static("/reports?year=2024"))
///     .header(http::header::ACCEPT, "text/html")
///     .build();
///
/// assert_eq!(request.path(), "/reports");
/// assert_eq!(request.query_value("year").as_deref(), Some("2024"));
/// assert!(request.accepts_html());
/// ```
#[derive(Clone)]
pub struct Request {
    inner: Arc<Inner>,
}

impl Request {
    /// Starts building a request.
    #[must_use]
    pub fn builder(method: Method, uri: Uri) -> RequestBuilder {
        RequestBuilder::new(method, uri)
    }

    /// Builds a request from an `http` request with a collected body.
    #[must_use]
    pub fn from_http(request: http::Request<Bytes>) -> Self {
        let (parts, body) = request.into_parts();
        let mut builder = RequestBuilder::new(parts.method, parts.uri).body(body);
        builder.headers = parts.headers;
        builder.build()
    }

    /// Returns a copy carrying the given path parameters.
    #[must_use]
    pub fn with_params(mut self, params: Params) -> Self {
        Arc::make_mut(&mut self.inner).params = params;
        self
    }

    /// Returns a copy carrying the given principal.
    #[must_use]
    pub fn with_principal(mut self, principal: Option<Principal>) -> Self {
        Arc::make_mut(&mut self.inner).principal = principal;
        self
    }

    /// Returns a copy attached to `session`.
    #[must_use]
    pub fn with_session(mut self, session: Arc<dyn Session>) -> Self {
        Arc::make_mut(&mut self.inner).session = Some(session);
        self
    }

    /// Request id.
    #[must_use]
    pub fn id(&self) -> RequestId {
        self.inner.id
    }

    /// HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.inner.method
    }

    /// Full request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.inner.uri
    }

    /// Request path without the query string.
    #[must_use]
    pub fn path(&self) -> &str {
        self.inner.uri.path()
    }

    /// Raw query string.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.inner.uri.query()
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.inner.headers
    }

    /// Returns a header value if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Collected request body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.inner.body
    }

    /// Path parameters captured by the matched route.
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.inner.params
    }

    /// One captured path parameter.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.inner.params.get(name)
    }

    /// Attached session, if any.
    #[must_use]
    pub fn session(&self) -> Option<&Arc<dyn Session>> {
        self.inner.session.as_ref()
    }

    /// Returns true if a session is attached.
    #[must_use]
    pub fn has_session(&self) -> bool {
        self.inner.session.is_some()
    }

    /// The authenticated principal, if any.
    #[must_use]
    pub fn principal(&self) -> Option<&Principal> {
        self.inner.principal.as_ref()
    }

    /// Returns true when the client asked for HTML.
    #[must_use]
    pub fn accepts_html(&self) -> bool {
        self.inner
            .headers
            .get_all(ACCEPT)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .any(|v| v.contains("text/html"))
    }

    /// Returns true when the body is a urlencoded form.
    #[must_use]
    pub fn is_form(&self) -> bool {
        self.header(CONTENT_TYPE.as_str())
            .is_some_and(|v| v.starts_with("application/x-www-form-urlencoded"))
    }

    /// Looks up a field of a urlencoded form body.
    #[must_use]
    pub fn form_value(&self, name: &str) -> Option<String> {
        if !self.is_form() {
            return None;
        }
        find_pair(&self.inner.body, name)
    }

    /// Looks up a query string parameter.
    #[must_use]
    pub fn query_value(&self, name: &str) -> Option<String> {
        find_pair(self.query()?.as_bytes(), name)
    }

    /// Stores a typed value visible to every clone of this request.
    pub fn insert_extension<T: Clone + Send + Sync + 'static>(&self, value: T) -> Option<T> {
        self.inner.extensions.lock().insert(value)
    }

    /// Returns a copy of a value stored with [`insert_extension`](Self::insert_extension).
    #[must_use]
    pub fn extension<T: Clone + Send + Sync + 'static>(&self) -> Option<T> {
        self.inner.extensions.lock().get::<T>().cloned()
    }
}

fn find_pair(encoded: &[u8], name: &str) -> Option<String> {
    serde_urlencoded::from_bytes::<Vec<(String, String)>>(encoded)
        .ok()?
        .into_iter()
        .find_map(|(key, value)| (key == name).then_some(value))
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("id", &self.inner.id)
            .field("method", &self.inner.method)
            .field("uri", &self.inner.uri)
            .field("params", &self.inner.params)
            .field("has_session", &self.inner.session.is_some())
            .field("principal", &self.inner.principal)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Request`].
#[derive(Debug)]
#[must_use]
pub struct RequestBuilder {
    id: Option<RequestId>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    session: Option<Arc<dyn Session>>,
    principal: Option<Principal>,
}

impl RequestBuilder {
    fn new(method: Method, uri: Uri) -> Self {
        Self {
            id: None,
            method,
            uri,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            session: None,
            principal: None,
        }
    }

    /// Uses a specific request id instead of a fresh one.
    pub fn id(mut self, id: RequestId) -> Self {
        self.id = Some(id);
        self
    }

    /// Appends a header. Values that are not valid header text are skipped.
    pub fn header(mut self, name: HeaderName, value: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.append(name, value);
        }
        self
    }

    /// Sets the body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets a urlencoded form body and the matching content type.
    pub fn form(self, fields: &[(&str, &str)]) -> Self {
        let encoded = serde_urlencoded::to_string(fields).unwrap_or_default();
        self.header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(encoded)
    }

    /// Attaches a session.
    pub fn session(mut self, session: Arc<dyn Session>) -> Self {
        self.session = Some(session);
        self
    }

    /// Presets the principal.
    pub fn principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    /// Finishes the request.
    #[must_use]
    pub fn build(self) -> Request {
        Request {
            inner: Arc::new(Inner {
                id: self.id.unwrap_or_default(),
                method: self.method,
                uri: self.uri,
                headers: self.headers,
                body: self.body,
                params: Params::new(),
                session: self.session,
                principal: self.principal,
                extensions: Arc::new(Mutex::new(Extensions::new())),
            }),
        }
    }
}
