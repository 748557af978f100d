//! Principal resolution and the access checker.

use std::fmt;
use std::sync::Arc;

use lodestar_core::{DispatchError, Principal, Request, UserDetailsService, USER_ID_KEY};

use crate::policy::{AccessDecision, RolePolicy};

/// Works out who is behind a request.
pub trait PrincipalResolver: Send + Sync {
    /// Returns the authenticated principal, or `None` for anonymous requests.
    fn resolve(&self, request: &Request) -> Option<Principal>;
}

/// Treats every request as anonymous.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousResolver;

impl PrincipalResolver for AnonymousResolver {
    fn resolve(&self, _request: &Request) -> Option<Principal> {
        None
    }
}

/// Resolves the principal from the user id stored in the session.
///
/// Unknown ids and disabled users resolve to `None`.
#[derive(Clone)]
pub struct SessionPrincipalResolver {
    users: Arc<dyn UserDetailsService>,
    session_key: String,
}

impl SessionPrincipalResolver {
    /// Looks users up in `users`, reading the id from the `user_id` session key.
    #[must_use]
    pub fn new(users: Arc<dyn UserDetailsService>) -> Self {
        Self {
            users,
            session_key: USER_ID_KEY.to_string(),
        }
    }

    /// Reads the user id from another session key.
    #[must_use]
    pub fn with_session_key(mut self, key: impl Into<String>) -> Self {
        self.session_key = key.into();
        self
    }
}

impl fmt::Debug for SessionPrincipalResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionPrincipalResolver")
            .field("session_key", &self.session_key)
            .finish_non_exhaustive()
    }
}

impl PrincipalResolver for SessionPrincipalResolver {
    fn resolve(&self, request: &Request) -> Option<Principal> {
        let user_id = request.session()?.get(&self.session_key)?;
        let user = self.users.load_by_id(&user_id)?;
        if !user.is_enabled() {
            tracing::debug!(user_id = %user_id, "Ignoring session of disabled user");
            return None;
        }
        Some(Principal::from_user(user.as_ref()))
    }
}

/// Resolves the principal and enforces the role policy for each request.
#[derive(Clone)]
pub struct AccessChecker {
    resolver: Arc<dyn PrincipalResolver>,
}

impl Default for AccessChecker {
    fn default() -> Self {
        Self::new(Arc::new(AnonymousResolver))
    }
}

impl AccessChecker {
    /// Creates a checker using `resolver` for requests without a principal.
    #[must_use]
    pub fn new(resolver: Arc<dyn PrincipalResolver>) -> Self {
        Self { resolver }
    }

    /// Attaches the principal to `request` and checks it against `policy`.
    ///
    /// A principal already present on the request is kept.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::AccessDenied`] when the policy rejects the request.
    pub fn authorize(&self, policy: &RolePolicy, request: Request) -> Result<Request, DispatchError> {
        let request = if request.principal().is_some() {
            request
        } else {
            let principal = self.resolver.resolve(&request);
            request.with_principal(principal)
        };

        match policy.check(request.path(), request.principal()) {
            AccessDecision::Denied(reason) => {
                tracing::warn!(
                    request_id = %request.id(),
                    method = %request.method(),
                    path = %request.path(),
                    reason = %reason,
                    "Access denied"
                );
                Err(DispatchError::AccessDenied {
                    path: request.path().to_string(),
                    reason,
                })
            }
            AccessDecision::Granted { role } => {
                tracing::debug!(request_id = %request.id(), role = %role, "Access granted");
                Ok(request)
            }
            AccessDecision::Public => Ok(request),
        }
    }
}

impl fmt::Debug for AccessChecker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessChecker").finish_non_exhaustive()
    }
}
