//! Error records and the sinks that receive them.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use http::{Method, StatusCode};
use lodestar_core::{ErrorCategory, FailureKind, RequestId};
use parking_lot::Mutex;

/// Server-side account of one failed request.
///
/// Carries the full cause; nothing in here is shown to the client.
#[derive(Clone)]
pub struct ErrorRecord {
    /// Pipeline stage that failed.
    pub kind: FailureKind,
    /// Who caused the failure.
    pub category: ErrorCategory,
    /// Status the client was sent.
    pub status: StatusCode,
    /// Display form of the cause.
    pub message: String,
    /// Handler that was being dispatched, if the route matched.
    pub handler: Option<String>,
    /// Request correlation id.
    pub request_id: RequestId,
    /// Request method.
    pub method: Method,
    /// Request path.
    pub path: String,
    /// When the failure was translated.
    pub timestamp: DateTime<Utc>,
    cause: Arc<anyhow::Error>,
}

impl ErrorRecord {
    /// Builds a record stamped with the current time.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        kind: FailureKind,
        category: ErrorCategory,
        status: StatusCode,
        handler: Option<String>,
        request_id: RequestId,
        method: Method,
        path: impl Into<String>,
        cause: anyhow::Error,
    ) -> Self {
        Self {
            kind,
            category,
            status,
            message: cause.to_string(),
            handler,
            request_id,
            method,
            path: path.into(),
            timestamp: Utc::now(),
            cause: Arc::new(cause),
        }
    }

    /// The original cause.
    #[must_use]
    pub fn cause(&self) -> &anyhow::Error {
        &self.cause
    }

    /// Returns true when the failure came out of a handler body.
    #[must_use]
    pub fn is_handler_failure(&self) -> bool {
        self.kind == FailureKind::Handler
    }

    /// Handler name for log lines, or the path when no route matched.
    #[must_use]
    pub fn origin(&self) -> &str {
        self.handler.as_deref().unwrap_or(&self.path)
    }
}

impl fmt::Debug for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorRecord")
            .field("kind", &self.kind)
            .field("category", &self.category)
            .field("status", &self.status)
            .field("message", &self.message)
            .field("handler", &self.handler)
            .field("request_id", &self.request_id)
            .field("path", &self.path)
            .field("timestamp", &self.timestamp)
            .finish_non_exhaustive()
    }
}

/// Receives every translated failure.
pub trait ErrorSink: Send + Sync {
    /// Consumes one record.
    fn record(&self, record: &ErrorRecord);
}

/// Writes records to `tracing`.
///
/// Client-caused failures are logged at `warn`, everything else at `error`
/// with the full cause chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ErrorSink for TracingSink {
    fn record(&self, record: &ErrorRecord) {
        let origin = record.origin();
        if record.category == ErrorCategory::Client {
            tracing::warn!(
                request_id = %record.request_id,
                method = %record.method,
                path = %record.path,
                kind = %record.kind,
                status = record.status.as_u16(),
                "Request rejected in route {origin}: {}",
                record.message
            );
        } else if record.is_handler_failure() {
            tracing::error!(
                request_id = %record.request_id,
                method = %record.method,
                path = %record.path,
                cause = ?record.cause(),
                "Error in route {origin}: {}",
                record.message
            );
        } else {
            tracing::error!(
                request_id = %record.request_id,
                method = %record.method,
                path = %record.path,
                kind = %record.kind,
                cause = ?record.cause(),
                "Framework error in route {origin}: {}",
                record.message
            );
        }
    }
}

/// Keeps records in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    records: Arc<Mutex<Vec<ErrorRecord>>>,
}

impl RecordingSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record received so far.
    #[must_use]
    pub fn records(&self) -> Vec<ErrorRecord> {
        self.records.lock().clone()
    }

    /// Number of records received.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl ErrorSink for RecordingSink {
    fn record(&self, record: &ErrorRecord) {
        self.records.lock().push(record.clone());
    }
}

/// Forwards each record to several sinks.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn ErrorSink>>,
}

impl FanoutSink {
    /// Creates a sink with no targets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a target.
    #[must_use]
    pub fn with(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl ErrorSink for FanoutSink {
    fn record(&self, record: &ErrorRecord) {
        for sink in &self.sinks {
            sink.record(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(handler: Option<&str>) -> ErrorRecord {
        ErrorRecord::new(
            FailureKind::Handler,
            ErrorCategory::Unknown,
            StatusCode::INTERNAL_SERVER_ERROR,
            handler.map(String::from),
            RequestId::new(),
            Method::GET,
            "/reports",
            anyhow::anyhow!("boom"),
        )
    }

    #[test]
    fn test_origin_prefers_handler() {
        assert_eq!(record(Some("Reports.index")).origin(), "Reports.index");
        assert_eq!(record(None).origin(), "/reports");
    }

    #[test]
    fn test_message_is_cause_display() {
        let record = record(None);
        assert_eq!(record.message, "boom");
        assert!(record.is_handler_failure());
    }

    #[test]
    fn test_fanout_reaches_every_sink() {
        let first = RecordingSink::new();
        let second = RecordingSink::new();
        let fanout = FanoutSink::new()
            .with(Arc::new(first.clone()))
            .with(Arc::new(second.clone()))
            .with(Arc::new(TracingSink));

        fanout.record(&record(None));

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
    }
}
