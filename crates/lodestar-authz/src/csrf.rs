//! CSRF token issuance and validation.
//!
//! Each session carries one random token. Forms echo it in a hidden `_csrf`
//! field and scripts send it in the `X-CSRF-Token` header. Validation only
//! runs for handlers that opt in.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use lodestar_core::{Request, Session};
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Session key holding the expected token.
pub const CSRF_SESSION_KEY: &str = "csrf_token";

/// Form field carrying the submitted token.
pub const CSRF_FORM_FIELD: &str = "_csrf";

/// Header carrying the submitted token.
pub const CSRF_HEADER: &str = "x-csrf-token";

const TOKEN_BYTES: usize = 32;

/// Generates a fresh random token, URL-safe base64 without padding.
#[must_use]
pub fn generate_token() -> String {
    let mut bytes = [0_u8; TOKEN_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Compares two tokens without leaking where they differ.
///
/// Both sides are hashed first so the comparison also hides length
/// differences. Empty tokens never match.
#[must_use]
pub fn tokens_match(submitted: &str, expected: &str) -> bool {
    if submitted.is_empty() || expected.is_empty() {
        return false;
    }
    let submitted = Sha256::digest(submitted.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());
    submitted.ct_eq(&expected).into()
}

/// Checks submitted tokens against the session's expected token.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use lodestar_authz::CsrfValidator;
/// use lodestar_core::{fixtures, MemorySession};
///
/// let validator = CsrfValidator::new();
/// let session = Arc::new(MemorySession::new("s"));
/// let token = validator.ensure_token(session.as_ref());
///
/// let request = fixtures::post("/profile")
///     .form(&[("_csrf", token.as_str())])
///     .session(session)
///     .build();
/// assert!(validator.validate(&request));
/// ```
#[derive(Debug, Clone)]
pub struct CsrfValidator {
    session_key: String,
    form_field: String,
    header: String,
}

impl Default for CsrfValidator {
    fn default() -> Self {
        Self {
            session_key: CSRF_SESSION_KEY.to_string(),
            form_field: CSRF_FORM_FIELD.to_string(),
            header: CSRF_HEADER.to_string(),
        }
    }
}

impl CsrfValidator {
    /// Creates a validator with the default key, field and header names.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses another session key for the expected token.
    #[must_use]
    pub fn with_session_key(mut self, key: impl Into<String>) -> Self {
        self.session_key = key.into();
        self
    }

    /// Uses another form field for submitted tokens.
    #[must_use]
    pub fn with_form_field(mut self, field: impl Into<String>) -> Self {
        self.form_field = field.into();
        self
    }

    /// Uses another header for submitted tokens.
    #[must_use]
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into().to_ascii_lowercase();
        self
    }

    /// Form field name templates should render the token under.
    #[must_use]
    pub fn form_field(&self) -> &str {
        &self.form_field
    }

    /// Returns the session's token, creating one if it has none.
    pub fn ensure_token(&self, session: &dyn Session) -> String {
        if let Some(token) = session.get(&self.session_key).filter(|t| !t.is_empty()) {
            return token;
        }
        self.rotate_token(session)
    }

    /// Replaces the session's token with a fresh one, e.g. after login.
    pub fn rotate_token(&self, session: &dyn Session) -> String {
        let token = generate_token();
        session.set(&self.session_key, token.clone());
        token
    }

    /// The token the client submitted, header first, then form field.
    #[must_use]
    pub fn submitted_token(&self, request: &Request) -> Option<String> {
        request
            .header(&self.header)
            .map(str::to_string)
            .or_else(|| request.form_value(&self.form_field))
    }

    /// Returns true if the request carries the session's token.
    ///
    /// Fails when there is no session, no expected token or no submitted token.
    #[must_use]
    pub fn validate(&self, request: &Request) -> bool {
        let Some(session) = request.session().filter(|s| s.exists()) else {
            return false;
        };
        let Some(expected) = session.get(&self.session_key) else {
            return false;
        };
        self.submitted_token(request)
            .is_some_and(|submitted| tokens_match(&submitted, &expected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lodestar_core::{fixtures, MemorySession};
    use std::sync::Arc;

    fn seeded(token: &str) -> Arc<MemorySession> {
        Arc::new(MemorySession::new("s").with(CSRF_SESSION_KEY, token))
    }

    #[test]
    fn test_generated_tokens_are_unique_and_url_safe() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_tokens_match() {
        assert!(tokens_match("abc", "abc"));
        assert!(!tokens_match("abc", "abd"));
        assert!(!tokens_match("abc", "abcd"));
        assert!(!tokens_match("", ""));
    }

    #[test]
    fn test_ensure_token_is_stable() {
        let validator = CsrfValidator::new();
        let session = MemorySession::new("s");
        let first = validator.ensure_token(&session);
        assert_eq!(validator.ensure_token(&session), first);
        assert_ne!(validator.rotate_token(&session), first);
    }

    #[test]
    fn test_validate_header_token() {
        let validator = CsrfValidator::new();
        let request = fixtures::post("/api/items")
            .header(http::header::HeaderName::from_static(CSRF_HEADER), "tok")
            .session(seeded("tok"))
            .build();
        assert!(validator.validate(&request));
    }

    #[test]
    fn test_validate_form_token() {
        let validator = CsrfValidator::new();
        let good = fixtures::post("/f").form(&[("_csrf", "tok")]).session(seeded("tok")).build();
        let bad = fixtures::post("/f").form(&[("_csrf", "nope")]).session(seeded("tok")).build();
        assert!(validator.validate(&good));
        assert!(!validator.validate(&bad));
    }

    #[test]
    fn test_validate_fails_without_session_or_token() {
        let validator = CsrfValidator::new();
        let no_session = fixtures::post("/f").form(&[("_csrf", "tok")]).build();
        let no_expected = fixtures::post("/f")
            .form(&[("_csrf", "tok")])
            .session(Arc::new(MemorySession::new("s")))
            .build();
        let no_submitted = fixtures::post("/f").session(seeded("tok")).build();

        assert!(!validator.validate(&no_session));
        assert!(!validator.validate(&no_expected));
        assert!(!validator.validate(&no_submitted));
    }

    #[test]
    fn test_custom_names() {
        let validator = CsrfValidator::new()
            .with_form_field("authenticity_token")
            .with_session_key("xsrf");
        let session = Arc::new(MemorySession::new("s").with("xsrf", "t1"));
        let request = fixtures::post("/f")
            .form(&[("authenticity_token", "t1")])
            .session(session)
            .build();
        assert!(validator.validate(&request));
        assert_eq!(validator.form_field(), "authenticity_token");
    }
}
