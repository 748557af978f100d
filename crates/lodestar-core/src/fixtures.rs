//! Test doubles shared by the Lodestar crates.
//!
//! # Example
//!
//! ```
//! use lodestar_core::fixtures;
//!
//! let log = fixtures::CallLog::new();
//! log.record("before:audit");
//! log.record("handler");
//! assert_eq!(log.entries(), vec!["before:audit", "handler"]);
//!
//! let request = fixtures::get("/dashboard").principal(fixtures::admin()).build();
//! assert!(request.principal().unwrap().has_role("admin"));
//! ```

use std::sync::Arc;

use http::{Method, Uri};
use parking_lot::Mutex;

use crate::context::RequestBuilder;
use crate::principal::Principal;
use crate::session::MemorySession;
use crate::Request;

/// Records calls in the order they happen.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    /// Snapshot of all entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    /// How many entries equal `entry`.
    #[must_use]
    pub fn count(&self, entry: &str) -> usize {
        self.entries.lock().iter().filter(|e| *e == entry).count()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Forgets everything recorded so far.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

/// Starts a request with the given method and static path.
pub fn request(method: Method, path: &'static str) -> RequestBuilder {
    Request::builder(method, Uri::from_static(path))
}

/// Starts a `GET` request.
pub fn get(path: &'static str) -> RequestBuilder {
    request(Method::GET, path)
}

/// Starts a `POST` request.
pub fn post(path: &'static str) -> RequestBuilder {
    request(Method::POST, path)
}

/// A fresh in-memory session.
#[must_use]
pub fn session() -> Arc<MemorySession> {
    Arc::new(MemorySession::new("test-session"))
}

/// A principal holding the `admin` role.
#[must_use]
pub fn admin() -> Principal {
    Principal::new("1", "admin").with_role("admin")
}

/// A principal holding only the `user` role.
#[must_use]
pub fn member() -> Principal {
    Principal::new("2", "member").with_role("user")
}
