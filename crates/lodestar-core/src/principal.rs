//! Authenticated identities and the user lookup boundary.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// The authenticated identity behind a request.
///
/// # Example
///
/// ```
/// use lodestar_core::Principal;
///
/// let admin = Principal::new("1", "ada").with_role("admin");
/// assert!(admin.has_role("admin"));
/// assert!(!admin.has_role("auditor"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    id: String,
    username: String,
    roles: Vec<String>,
}

impl Principal {
    /// Creates a principal without roles.
    #[must_use]
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            roles: Vec::new(),
        }
    }

    /// Adds a role.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        let role = role.into();
        if !self.roles.contains(&role) {
            self.roles.push(role);
        }
        self
    }

    /// Builds a principal from a loaded user record.
    #[must_use]
    pub fn from_user(user: &dyn UserDetails) -> Self {
        Self::new(user.id(), user.username()).with_role(user.role())
    }

    /// User id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Login name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Granted roles.
    #[must_use]
    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    /// Returns true if `role` was granted.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.username, self.id)
    }
}

/// A user record as seen by the access checker.
pub trait UserDetails: Send + Sync {
    /// Stable user id, as stored in the session.
    fn id(&self) -> String;

    /// Login name.
    fn username(&self) -> &str;

    /// The user's single role.
    fn role(&self) -> &str;

    /// Disabled users are treated as unauthenticated.
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Looks users up in whatever store backs the application.
pub trait UserDetailsService: Send + Sync {
    /// Finds a user by login name.
    fn load_by_username(&self, username: &str) -> Option<Arc<dyn UserDetails>>;

    /// Finds a user by id.
    fn load_by_id(&self, id: &str) -> Option<Arc<dyn UserDetails>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Account {
        enabled: bool,
    }

    impl UserDetails for Account {
        fn id(&self) -> String {
            "12".to_string()
        }

        fn username(&self) -> &str {
            "grace"
        }

        fn role(&self) -> &str {
            "editor"
        }

        fn is_enabled(&self) -> bool {
            self.enabled
        }
    }

    #[test]
    fn test_roles_are_deduplicated() {
        let p = Principal::new("1", "a").with_role("x").with_role("x");
        assert_eq!(p.roles(), &["x".to_string()]);
    }

    #[test]
    fn test_from_user() {
        let account = Account { enabled: true };
        let p = Principal::from_user(&account);
        assert_eq!(p.id(), "12");
        assert_eq!(p.username(), "grace");
        assert!(p.has_role("editor"));
        assert_eq!(p.to_string(), "grace#12");
    }

    #[test]
    fn test_enabled_flag() {
        assert!(!Account { enabled: false }.is_enabled());
        assert!(Account { enabled: true }.is_enabled());
    }
}
