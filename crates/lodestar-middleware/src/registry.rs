//! Name to middleware lookup.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use lodestar_core::{DispatchError, MiddlewarePhase, Request, Response};

use crate::error::MiddlewareError;
use crate::middleware::Middleware;

/// Middleware keyed by the name handlers reference them with.
///
/// Populated during startup and then shared read-only; the dispatcher holds it
/// behind an `Arc`.
///
/// # Example
///
/// ```
/// use lodestar_middleware::{FnMiddleware, MiddlewareRegistry};
///
/// let registry = MiddlewareRegistry::new()
///     .with(FnMiddleware::new("audit", |_request, _response| async { Ok(()) }))
///     .unwrap();
///
/// assert!(registry.contains("audit"));
/// assert!(!registry.contains("missing"));
/// ```
#[derive(Clone, Default)]
pub struct MiddlewareRegistry {
    entries: IndexMap<String, Arc<dyn Middleware>>,
}

impl MiddlewareRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a middleware under its own name.
    ///
    /// # Errors
    ///
    /// Fails if the name is empty or already taken. The first registration
    /// stays in place.
    pub fn register(&mut self, middleware: impl Middleware) -> Result<(), MiddlewareError> {
        self.register_arc(Arc::new(middleware))
    }

    /// Registers a shared middleware under its own name.
    ///
    /// # Errors
    ///
    /// Same as [`register`](Self::register).
    pub fn register_arc(&mut self, middleware: Arc<dyn Middleware>) -> Result<(), MiddlewareError> {
        let name = middleware.name().to_string();
        if name.is_empty() {
            return Err(MiddlewareError::EmptyName);
        }
        if self.entries.contains_key(&name) {
            return Err(MiddlewareError::Duplicate(name));
        }
        tracing::debug!(middleware = %name, "Registered middleware");
        self.entries.insert(name, middleware);
        Ok(())
    }

    /// Builder form of [`register`](Self::register).
    ///
    /// # Errors
    ///
    /// Same as [`register`](Self::register).
    pub fn with(mut self, middleware: impl Middleware) -> Result<Self, MiddlewareError> {
        self.register(middleware)?;
        Ok(self)
    }

    /// Looks a middleware up by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Middleware>> {
        self.entries.get(name)
    }

    /// Returns true if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Names from `names` that are not registered.
    #[must_use]
    pub fn missing<'a>(&self, names: &'a [String]) -> Vec<&'a str> {
        names
            .iter()
            .filter(|name| !self.contains(name))
            .map(String::as_str)
            .collect()
    }

    /// Number of registered middleware.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Runs the named middleware in order.
    ///
    /// Stops at the first name that is unknown or whose middleware fails;
    /// later names do not run.
    ///
    /// # Errors
    ///
    /// [`DispatchError::UnknownMiddleware`] for an unregistered name and
    /// [`DispatchError::Middleware`] when a middleware returns an error.
    pub async fn run(
        &self,
        names: &[String],
        phase: MiddlewarePhase,
        request: &Request,
        response: &Response,
    ) -> Result<(), DispatchError> {
        for name in names {
            let Some(middleware) = self.entries.get(name) else {
                return Err(DispatchError::UnknownMiddleware {
                    name: name.clone(),
                    phase,
                });
            };

            tracing::debug!(
                request_id = %request.id(),
                middleware = %name,
                phase = %phase,
                "Running middleware"
            );

            middleware
                .call(request, response)
                .await
                .map_err(|source| DispatchError::Middleware {
                    name: name.clone(),
                    phase,
                    source,
                })?;
        }
        Ok(())
    }
}

impl fmt::Debug for MiddlewareRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareRegistry")
            .field("names", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}
