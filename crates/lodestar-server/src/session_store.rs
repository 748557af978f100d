//! In-memory, cookie-keyed session store.
//!
//! Every request gets a [`CookieSession`]. A request without a live cookie
//! gets one that is stored only when something is written to it, so reads,
//! 404s and anonymous API calls allocate nothing in the store and get no
//! cookie. Sessions expire after an idle TTL; expired ones are dropped lazily
//! on access and in bulk by [`SessionStore::purge_expired`].

use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use dashmap::DashMap;
use http::header::COOKIE;
use http::{HeaderMap, HeaderValue};
use lodestar_core::{MemorySession, Session};
use rand::RngCore;

const SESSION_ID_BYTES: usize = 32;

#[derive(Debug)]
struct Entry {
    session: Arc<MemorySession>,
    last_seen: Instant,
}

/// Session cookie attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    /// Cookie name.
    pub name: String,
    /// Idle lifetime.
    pub ttl: Duration,
    /// Mark the cookie `Secure`.
    pub secure: bool,
}

impl Default for SessionCookie {
    fn default() -> Self {
        Self {
            name: "LODESTAR_SESSION".to_string(),
            ttl: Duration::from_secs(1800),
            secure: false,
        }
    }
}

/// Sessions keyed by the id carried in the session cookie.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<String, Entry>,
    cookie: SessionCookie,
}

impl SessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new(cookie: SessionCookie) -> Self {
        Self {
            sessions: DashMap::new(),
            cookie,
        }
    }

    /// Cookie attributes.
    #[must_use]
    pub fn cookie(&self) -> &SessionCookie {
        &self.cookie
    }

    /// The session named by the request cookie, or a pending one that is
    /// stored on first write.
    pub fn attach(self: &Arc<Self>, headers: &HeaderMap) -> Arc<CookieSession> {
        let loaded = self
            .cookie_value(headers)
            .and_then(|id| self.touch(&id));
        let session = match loaded {
            Some(existing) => CookieSession {
                id: existing.id().to_string(),
                store: Arc::clone(self),
                stored: OnceLock::from(existing),
                fresh: false,
            },
            None => CookieSession {
                id: new_session_id(),
                store: Arc::clone(self),
                stored: OnceLock::new(),
                fresh: true,
            },
        };
        Arc::new(session)
    }

    fn create(&self, id: &str) -> Arc<MemorySession> {
        let session = Arc::new(MemorySession::new(id));
        self.sessions.insert(
            id.to_string(),
            Entry {
                session: Arc::clone(&session),
                last_seen: Instant::now(),
            },
        );
        tracing::debug!(sessions = self.sessions.len(), "Session created");
        session
    }

    fn touch(&self, id: &str) -> Option<Arc<MemorySession>> {
        {
            let mut entry = self.sessions.get_mut(id)?;
            if entry.last_seen.elapsed() <= self.cookie.ttl {
                entry.last_seen = Instant::now();
                return Some(Arc::clone(&entry.session));
            }
        }
        self.sessions.remove(id);
        None
    }

    /// `Set-Cookie` value for `session_id`.
    #[must_use]
    pub fn set_cookie(&self, session_id: &str) -> Option<HeaderValue> {
        let mut cookie = format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
            self.cookie.name,
            session_id,
            self.cookie.ttl.as_secs()
        );
        if self.cookie.secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie).ok()
    }

    /// Drops every session idle for longer than the TTL.
    pub fn purge_expired(&self) -> usize {
        let before = self.sessions.len();
        let ttl = self.cookie.ttl;
        self.sessions.retain(|_, entry| entry.last_seen.elapsed() <= ttl);
        let purged = before.saturating_sub(self.sessions.len());
        if purged > 0 {
            tracing::debug!(purged, "Expired sessions purged");
        }
        purged
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns true if no session is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn cookie_value(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.cookie.name)
            .map(|(_, value)| value.to_string())
    }
}

/// A request's view of its session.
///
/// Reads on a session that was never written see nothing; the first write
/// stores it in the [`SessionStore`].
pub struct CookieSession {
    id: String,
    store: Arc<SessionStore>,
    stored: OnceLock<Arc<MemorySession>>,
    fresh: bool,
}

impl CookieSession {
    /// Returns true when the session was created during this request and its
    /// cookie must be sent back.
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.fresh && self.stored.get().is_some()
    }

    fn stored(&self) -> &Arc<MemorySession> {
        self.stored.get_or_init(|| self.store.create(&self.id))
    }
}

impl Session for CookieSession {
    fn id(&self) -> &str {
        &self.id
    }

    fn get(&self, key: &str) -> Option<String> {
        self.stored.get()?.get(key)
    }

    fn set(&self, key: &str, value: String) {
        self.stored().set(key, value);
    }

    fn remove(&self, key: &str) -> Option<String> {
        self.stored.get()?.remove(key)
    }

    fn exists(&self) -> bool {
        self.stored.get().is_some()
    }
}

impl fmt::Debug for CookieSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieSession")
            .field("id", &self.id)
            .field("stored", &self.stored.get().is_some())
            .field("fresh", &self.fresh)
            .finish_non_exhaustive()
    }
}

fn new_session_id() -> String {
    let mut bytes = [0u8; SESSION_ID_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
