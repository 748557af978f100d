//! Session boundary.
//!
//! The dispatcher only needs string get/set/remove on a session. Storage,
//! expiry and cookies belong to whoever creates sessions; the HTTP host ships
//! an in-memory store.

use std::collections::HashMap;
use std::fmt;

use parking_lot::RwLock;

/// Session key holding the user-facing error flash message.
pub const FLASH_ERROR_KEY: &str = "flash_error";

/// Session key holding the authenticated user's id.
pub const USER_ID_KEY: &str = "user_id";

/// A server-side session attached to a request.
///
/// Implementations use interior mutability; a session is shared between the
/// request and its store.
pub trait Session: Send + Sync + fmt::Debug {
    /// Opaque session id.
    fn id(&self) -> &str;

    /// Returns the value stored under `key`.
    fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: String);

    /// Removes and returns the value under `key`.
    fn remove(&self, key: &str) -> Option<String>;

    /// Whether the session is backed by stored state.
    ///
    /// A store may hand out sessions that only come into existence on their
    /// first write; those report `false` until then.
    fn exists(&self) -> bool {
        true
    }

    /// Stores a user-facing error message for the next rendered page.
    fn flash_error(&self, message: &str) {
        self.set(FLASH_ERROR_KEY, message.to_string());
    }

    /// Takes the pending error flash message, if any.
    fn take_flash_error(&self) -> Option<String> {
        self.remove(FLASH_ERROR_KEY)
    }
}

/// A session backed by a locked hash map.
#[derive(Debug, Default)]
pub struct MemorySession {
    id: String,
    values: RwLock<HashMap<String, String>>,
}

impl MemorySession {
    /// Creates an empty session with the given id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            values: RwLock::new(HashMap::new()),
        }
    }

    /// Builder-style insert, handy when seeding a session.
    #[must_use]
    pub fn with(self, key: &str, value: impl Into<String>) -> Self {
        self.values.write().insert(key.to_string(), value.into());
        self
    }

    /// Number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}

impl Session for MemorySession {
    fn id(&self) -> &str {
        &self.id
    }

    fn get(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.values.write().insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) -> Option<String> {
        self.values.write().remove(key)
    }
}
