//! Turns pipeline failures into client-safe responses.
//!
//! The translator is the only place that writes an error response. It logs
//! the full cause through an [`ErrorSink`] and shows the client nothing but a
//! status, a configured message and the request id.
//!
//! | Failure | HTML client | API client |
//! |---|---|---|
//! | unauthenticated | 401 page, or redirect to the login path | 401 envelope |
//! | insufficient role, CSRF | 403 page | 403 envelope |
//! | anything else | flash + 302 to the error route | 500 envelope |
//!
//! The envelope has a fixed shape:
//!
//! ```json
//! {
//!   "error": { "code": "INTERNAL_ERROR", "message": "Internal server error" },
//!   "request_id": "0190b2a4-..."
//! }
//! ```

use std::sync::Arc;

use http::header::CONTENT_TYPE;
use http::StatusCode;
use lodestar_core::{DenialReason, DispatchError, FailureKind, Request, Response};
use serde::{Deserialize, Serialize};

use crate::record::{ErrorRecord, ErrorSink, TracingSink};

/// User-facing messages and redirect targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatorConfig {
    /// Where HTML clients are sent after a server-side failure.
    pub error_route: String,
    /// Flash message for server-side failures.
    pub generic_message: String,
    /// Flash message for CSRF failures.
    pub csrf_message: String,
    /// Flash message for unauthenticated requests.
    pub unauthenticated_message: String,
    /// Flash message for requests lacking a role.
    pub forbidden_message: String,
    /// If set, unauthenticated HTML requests are redirected here.
    pub login_path: Option<String>,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            error_route: "/error".to_string(),
            generic_message: "An error occurred. Please try again.".to_string(),
            csrf_message: "Invalid security token. Please try again.".to_string(),
            unauthenticated_message: "Please sign in to continue.".to_string(),
            forbidden_message: "You do not have permission to access this page.".to_string(),
            login_path: None,
        }
    }
}

impl TranslatorConfig {
    /// Sets the error route.
    #[must_use]
    pub fn with_error_route(mut self, route: impl Into<String>) -> Self {
        self.error_route = route.into();
        self
    }

    /// Sets the login redirect for unauthenticated HTML requests.
    #[must_use]
    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = Some(path.into());
        self
    }

    /// Sets the generic flash message.
    #[must_use]
    pub fn with_generic_message(mut self, message: impl Into<String>) -> Self {
        self.generic_message = message.into();
        self
    }

    /// Sets the CSRF flash message.
    #[must_use]
    pub fn with_csrf_message(mut self, message: impl Into<String>) -> Self {
        self.csrf_message = message.into();
        self
    }
}

/// JSON error envelope sent to API clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The error.
    pub error: ErrorDetail,
    /// Correlation id.
    pub request_id: String,
}

/// Code and message inside an [`ErrorEnvelope`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable code.
    pub code: String,
    /// Fixed human-readable message.
    pub message: String,
}

/// The single point that decides what a client sees after a failure.
#[derive(Clone)]
pub struct ErrorTranslator {
    config: TranslatorConfig,
    sink: Arc<dyn ErrorSink>,
}

impl Default for ErrorTranslator {
    fn default() -> Self {
        Self::new(TranslatorConfig::default())
    }
}

impl std::fmt::Debug for ErrorTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorTranslator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ErrorTranslator {
    /// Creates a translator that logs through `tracing`.
    #[must_use]
    pub fn new(config: TranslatorConfig) -> Self {
        Self {
            config,
            sink: Arc::new(TracingSink),
        }
    }

    /// Replaces the sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.sink = sink;
        self
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    /// Records `error` and rewrites `response` for the client.
    ///
    /// Handler failures are unwrapped to their original cause before they are
    /// recorded. Whatever the handler or middleware had written to the
    /// response is discarded.
    pub fn translate(
        &self,
        error: DispatchError,
        handler: Option<&str>,
        request: &Request,
        response: &Response,
    ) -> ErrorRecord {
        let html = wants_html(request, response);
        let kind = error.kind();
        let category = error.category();
        let handler = match &error {
            DispatchError::Handler(failure) => Some(failure.handler().to_string()),
            _ => handler.map(ToString::to_string),
        };
        let denial = match &error {
            DispatchError::AccessDenied { reason, .. } => Some(reason.clone()),
            _ => None,
        };

        response.reset();
        let status = match (kind, denial) {
            (FailureKind::AccessDenied, Some(reason)) => self.deny(&reason, html, request, response),
            (FailureKind::Csrf, _) => {
                self.flash(request, &self.config.csrf_message);
                self.reject(StatusCode::FORBIDDEN, html, request, response);
                StatusCode::FORBIDDEN
            }
            _ => self.fail(html, request, response),
        };

        let record = ErrorRecord::new(
            kind,
            category,
            status,
            handler,
            request.id(),
            request.method().clone(),
            request.path(),
            error.into_cause(),
        );
        self.sink.record(&record);
        record
    }

    fn deny(
        &self,
        reason: &DenialReason,
        html: bool,
        request: &Request,
        response: &Response,
    ) -> StatusCode {
        match reason {
            DenialReason::Unauthenticated => {
                self.flash(request, &self.config.unauthenticated_message);
                if html {
                    if let Some(login) = &self.config.login_path {
                        if response.redirect(login).is_ok() {
                            return StatusCode::FOUND;
                        }
                    }
                }
                self.reject(StatusCode::UNAUTHORIZED, html, request, response);
                StatusCode::UNAUTHORIZED
            }
            DenialReason::InsufficientRole { .. } => {
                self.flash(request, &self.config.forbidden_message);
                self.reject(StatusCode::FORBIDDEN, html, request, response);
                StatusCode::FORBIDDEN
            }
        }
    }

    fn fail(&self, html: bool, request: &Request, response: &Response) -> StatusCode {
        if html {
            self.flash(request, &self.config.generic_message);
            match response.redirect(&self.config.error_route) {
                Ok(()) => return StatusCode::FOUND,
                Err(err) => tracing::warn!(
                    error_route = %self.config.error_route,
                    error = %err,
                    "Error route is not a valid location"
                ),
            }
        }
        write_envelope(StatusCode::INTERNAL_SERVER_ERROR, request, response);
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn reject(&self, status: StatusCode, html: bool, request: &Request, response: &Response) {
        write_status(status, html, request, response);
    }

    fn flash(&self, request: &Request, message: &str) {
        if let Some(session) = request.session().filter(|s| s.exists()) {
            session.flash_error(message);
        }
    }
}

/// Whether the failed request should be answered with browser-oriented output.
///
/// A content type already chosen by the handler wins; otherwise the request's
/// `Accept` header decides.
#[must_use]
pub fn wants_html(request: &Request, response: &Response) -> bool {
    match response.content_type() {
        Some(content_type) => content_type.contains("html"),
        None => request.accepts_html(),
    }
}

/// Machine-readable code for a status.
#[must_use]
pub fn status_code_name(status: StatusCode) -> &'static str {
    match status.as_u16() {
        400 => "BAD_REQUEST",
        401 => "UNAUTHORIZED",
        403 => "FORBIDDEN",
        404 => "NOT_FOUND",
        405 => "METHOD_NOT_ALLOWED",
        408 => "REQUEST_TIMEOUT",
        413 => "PAYLOAD_TOO_LARGE",
        503 => "SERVICE_UNAVAILABLE",
        _ => "INTERNAL_ERROR",
    }
}

/// Builds the envelope for `status`.
#[must_use]
pub fn envelope(status: StatusCode, request_id: impl ToString) -> ErrorEnvelope {
    let message = match status {
        StatusCode::INTERNAL_SERVER_ERROR => "Internal server error",
        other => other.canonical_reason().unwrap_or("Error"),
    };
    ErrorEnvelope {
        error: ErrorDetail {
            code: status_code_name(status).to_string(),
            message: message.to_string(),
        },
        request_id: request_id.to_string(),
    }
}

/// Writes the JSON envelope for `status` into `response`.
pub fn write_envelope(status: StatusCode, request: &Request, response: &Response) {
    let body = serde_json::to_vec(&envelope(status, request.id())).unwrap_or_default();
    response.set_status(status);
    response.insert_header(
        CONTENT_TYPE,
        http::HeaderValue::from_static("application/json"),
    );
    response.set_body(body);
}

/// Writes a bare status response: a minimal HTML page or the JSON envelope.
pub fn write_status(status: StatusCode, html: bool, request: &Request, response: &Response) {
    if html {
        response.set_status(status);
        response.set_content_type("text/html; charset=utf-8");
        response.set_body(status_page(status));
    } else {
        write_envelope(status, request, response);
    }
}

fn status_page(status: StatusCode) -> String {
    let reason = status.canonical_reason().unwrap_or("Error");
    let code = status.as_u16();
    format!(
        "<!DOCTYPE html><html><head><title>{code} {reason}</title></head>\
         <body><h1>{code} {reason}</h1></body></html>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordingSink;
    use http::header::ACCEPT;
    use lodestar_core::{fixtures, InjectionError, InvocationFailure, ServiceKey, Session};

    #[derive(Debug, thiserror::Error)]
    #[error("password for db=prod is hunter2")]
    struct SecretError;

    fn translator() -> (ErrorTranslator, RecordingSink) {
        let sink = RecordingSink::new();
        let translator = ErrorTranslator::default().with_sink(Arc::new(sink.clone()));
        (translator, sink)
    }

    fn handler_failure() -> DispatchError {
        let inner = InvocationFailure::new("Reports.index", SecretError);
        DispatchError::Handler(InvocationFailure::new("Reports.index", inner))
    }

    fn body_text(response: &Response) -> String {
        String::from_utf8(response.body().unwrap_or_default().to_vec()).unwrap()
    }

    #[test]
    fn test_api_failure_gets_fixed_envelope() {
        let (translator, sink) = translator();
        let request = fixtures::get("/api/reports").build();
        let response = Response::new();
        response.set_body("partial output");

        let record = translator.translate(handler_failure(), None, &request, &response);

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let envelope: ErrorEnvelope = serde_json::from_str(&body_text(&response)).unwrap();
        assert_eq!(envelope.error.code, "INTERNAL_ERROR");
        assert_eq!(envelope.error.message, "Internal server error");
        assert_eq!(envelope.request_id, request.id().to_string());
        assert_eq!(record.handler.as_deref(), Some("Reports.index"));
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_record_holds_unwrapped_cause() {
        let (translator, sink) = translator();
        let request = fixtures::get("/api/reports").build();

        translator.translate(handler_failure(), None, &request, &Response::new());

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert!(records[0].cause().is::<SecretError>());
        assert_eq!(records[0].kind, FailureKind::Handler);
    }

    #[test]
    fn test_cause_message_never_reaches_client() {
        let (translator, _) = translator();
        for accept in ["text/html", "application/json"] {
            let session = fixtures::session();
            let request = fixtures::get("/reports")
                .header(ACCEPT, accept)
                .session(session.clone())
                .build();
            let response = Response::new();

            translator.translate(handler_failure(), None, &request, &response);

            assert!(!body_text(&response).contains("hunter2"));
            assert!(!session.get(lodestar_core::FLASH_ERROR_KEY).unwrap_or_default().contains("hunter2"));
        }
    }

    #[test]
    fn test_html_failure_redirects_with_flash() {
        let (translator, _) = translator();
        let session = fixtures::session();
        let request = fixtures::get("/reports")
            .header(ACCEPT, "text/html,application/xhtml+xml")
            .session(session.clone())
            .build();
        let response = Response::new();

        let record = translator.translate(handler_failure(), None, &request, &response);

        assert_eq!(record.status, StatusCode::FOUND);
        assert_eq!(response.location().as_deref(), Some("/error"));
        assert_eq!(
            session.take_flash_error().as_deref(),
            Some("An error occurred. Please try again.")
        );
    }

    #[test]
    fn test_handler_content_type_decides_html() {
        let (translator, _) = translator();
        let request = fixtures::get("/page").build();
        let response = Response::new();
        response.set_content_type("text/html");

        translator.translate(handler_failure(), None, &request, &response);

        assert_eq!(response.status(), StatusCode::FOUND);
    }

    #[test]
    fn test_unauthenticated_keeps_401() {
        let (translator, sink) = translator();
        let request = fixtures::get("/admin").build();
        let response = Response::new();
        let error = DispatchError::AccessDenied {
            path: "/admin".into(),
            reason: DenialReason::Unauthenticated,
        };

        translator.translate(error, None, &request, &response);

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let envelope: ErrorEnvelope = serde_json::from_str(&body_text(&response)).unwrap();
        assert_eq!(envelope.error.code, "UNAUTHORIZED");
        assert_eq!(sink.records()[0].category, lodestar_core::ErrorCategory::Client);
    }

    #[test]
    fn test_unauthenticated_html_goes_to_login_when_configured() {
        let sink = RecordingSink::new();
        let translator = ErrorTranslator::new(TranslatorConfig::default().with_login_path("/login"))
            .with_sink(Arc::new(sink));
        let request = fixtures::get("/admin").header(ACCEPT, "text/html").build();
        let response = Response::new();
        let error = DispatchError::AccessDenied {
            path: "/admin".into(),
            reason: DenialReason::Unauthenticated,
        };

        let record = translator.translate(error, None, &request, &response);

        assert_eq!(record.status, StatusCode::FOUND);
        assert_eq!(response.location().as_deref(), Some("/login"));
    }

    #[test]
    fn test_forbidden_html_page() {
        let (translator, _) = translator();
        let request = fixtures::get("/admin").header(ACCEPT, "text/html").build();
        let response = Response::new();
        let error = DispatchError::AccessDenied {
            path: "/admin".into(),
            reason: DenialReason::InsufficientRole {
                required: "admin".into(),
            },
        };

        translator.translate(error, None, &request, &response);

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(body_text(&response).contains("403 Forbidden"));
        assert!(!body_text(&response).contains("admin"));
    }

    #[test]
    fn test_csrf_failure_is_403_with_flash() {
        let (translator, sink) = translator();
        let session = fixtures::session();
        let request = fixtures::post("/profile").session(session.clone()).build();
        let response = Response::new();
        let error = DispatchError::Csrf {
            handler: "Profile.update".into(),
        };

        translator.translate(error, Some("Profile.update"), &request, &response);

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            session.take_flash_error().as_deref(),
            Some("Invalid security token. Please try again.")
        );
        assert_eq!(sink.records()[0].kind, FailureKind::Csrf);
    }

    #[test]
    fn test_resolution_failure_is_framework_error() {
        let (translator, sink) = translator();
        let request = fixtures::get("/api/x").build();
        let error = DispatchError::Resolution(InjectionError::not_registered(&ServiceKey::of::<u8>()));

        translator.translate(error, Some("X.show"), &request, &Response::new());

        let record = &sink.records()[0];
        assert!(!record.is_handler_failure());
        assert_eq!(record.category, lodestar_core::ErrorCategory::Server);
        assert_eq!(record.handler.as_deref(), Some("X.show"));
    }

    #[test]
    fn test_status_code_names() {
        assert_eq!(status_code_name(StatusCode::NOT_FOUND), "NOT_FOUND");
        assert_eq!(status_code_name(StatusCode::BAD_GATEWAY), "INTERNAL_ERROR");
    }
}
