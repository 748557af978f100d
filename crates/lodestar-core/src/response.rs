//! The response carrier.
//!
//! Handlers and middleware share one [`Response`] per request and write to it
//! through `&self`; the host turns it into an `http::Response` once the
//! pipeline has finished.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, InvalidHeaderValue, CONTENT_TYPE, LOCATION};
use http::{HeaderMap, StatusCode};
use parking_lot::Mutex;

#[derive(Debug)]
struct State {
    status: StatusCode,
    headers: HeaderMap,
    body: Option<Bytes>,
}

/// Mutable response builder shared by the pipeline stages of one request.
///
/// # Example
///
/// ```
/// use lodestar_core::Response;
/// use http::StatusCode;
///
/// let response = Response::new();
/// response.set_content_type("application/json");
/// response.set_body(r#"{"ok":true}"#);
///
/// assert_eq!(response.status(), StatusCode::OK);
/// assert_eq!(response.content_type().as_deref(), Some("application/json"));
/// ```
#[derive(Clone)]
pub struct Response {
    state: Arc<Mutex<State>>,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    /// Creates an empty `200 OK` response.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                status: StatusCode::OK,
                headers: HeaderMap::new(),
                body: None,
            })),
        }
    }

    /// Sets the status code.
    pub fn set_status(&self, status: StatusCode) {
        self.state.lock().status = status;
    }

    /// Current status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.state.lock().status
    }

    /// Sets the `Content-Type`.
    ///
    /// Values that are not valid header text leave the type unset.
    pub fn set_content_type(&self, mime: &str) {
        if let Ok(value) = HeaderValue::from_str(mime) {
            self.state.lock().headers.insert(CONTENT_TYPE, value);
        }
    }

    /// Current `Content-Type`, if set.
    #[must_use]
    pub fn content_type(&self) -> Option<String> {
        self.header(CONTENT_TYPE)
    }

    /// Redirects to `location` with `302 Found`, discarding any body.
    pub fn redirect(&self, location: &str) -> Result<(), InvalidHeaderValue> {
        let value = HeaderValue::from_str(location)?;
        let mut state = self.state.lock();
        state.status = StatusCode::FOUND;
        state.headers.insert(LOCATION, value);
        state.body = None;
        Ok(())
    }

    /// Redirect target, if a redirect was issued.
    #[must_use]
    pub fn location(&self) -> Option<String> {
        self.header(LOCATION)
    }

    /// Replaces the body.
    pub fn set_body(&self, body: impl Into<Bytes>) {
        self.state.lock().body = Some(body.into());
    }

    /// Copy of the body, if one was written.
    #[must_use]
    pub fn body(&self) -> Option<Bytes> {
        self.state.lock().body.clone()
    }

    /// Returns true if a body was written.
    #[must_use]
    pub fn has_body(&self) -> bool {
        self.state.lock().body.is_some()
    }

    /// Sets a header, replacing previous values.
    pub fn insert_header(&self, name: HeaderName, value: HeaderValue) {
        self.state.lock().headers.insert(name, value);
    }

    /// Returns a header value as text.
    #[must_use]
    pub fn header(&self, name: HeaderName) -> Option<String> {
        self.state
            .lock()
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    /// Clears status, headers and body back to an empty `200 OK`.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.status = StatusCode::OK;
        state.headers.clear();
        state.body = None;
    }

    /// Snapshots the response as an `http::Response`.
    #[must_use]
    pub fn to_http(&self) -> http::Response<Bytes> {
        let state = self.state.lock();
        let mut response = http::Response::new(state.body.clone().unwrap_or_default());
        *response.status_mut() = state.status;
        *response.headers_mut() = state.headers.clone();
        response
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Response")
            .field("status", &state.status)
            .field("headers", &state.headers)
            .field("body_len", &state.body.as_ref().map(Bytes::len))
            .finish()
    }
}
