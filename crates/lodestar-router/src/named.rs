//! Named route index and reverse routing.
//!
//! A name maps to exactly one path pattern. Binding a name to the pattern it
//! already has is a no-op, so several methods on one path can share a name.
//! Binding it to a different pattern is rejected.

use indexmap::IndexMap;

use crate::error::RouteError;
use crate::pattern::PathPattern;

/// Index from route name to path pattern.
///
/// # Example
///
/// ```rust
/// use lodestar_router::NamedRoutes;
///
/// let mut names = NamedRoutes::new();
/// names.register("user", "/users/{id}").unwrap();
///
/// assert_eq!(names.path("user"), Some("/users/{id}"));
/// assert_eq!(names.url_for("user", &[("id", "42")]).unwrap(), "/users/42");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamedRoutes {
    routes: IndexMap<String, PathPattern>,
}

impl NamedRoutes {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name` to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::DuplicateName`] when `name` is bound to a
    /// different path, or [`RouteError::InvalidPattern`] for a bad path.
    pub fn register(&mut self, name: &str, path: &str) -> Result<(), RouteError> {
        if let Some(existing) = self.routes.get(name) {
            if existing.as_str() == path {
                return Ok(());
            }
            return Err(RouteError::DuplicateName {
                name: name.to_string(),
                existing: existing.as_str().to_string(),
                attempted: path.to_string(),
            });
        }
        self.routes
            .insert(name.to_string(), PathPattern::parse(path)?);
        Ok(())
    }

    /// Checks whether `name` could be bound to `path` without changing anything.
    ///
    /// # Errors
    ///
    /// The same conflict [`register`](Self::register) would report.
    pub fn check(&self, name: &str, path: &str) -> Result<(), RouteError> {
        match self.routes.get(name) {
            Some(existing) if existing.as_str() != path => Err(RouteError::DuplicateName {
                name: name.to_string(),
                existing: existing.as_str().to_string(),
                attempted: path.to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Returns the path pattern bound to `name`.
    #[must_use]
    pub fn path(&self, name: &str) -> Option<&str> {
        self.routes.get(name).map(PathPattern::as_str)
    }

    /// Builds a concrete URL for `name`, filling each parameter from `params`.
    ///
    /// Values are percent-encoded, so `/`, `?` and `#` stay inside their
    /// segment. Extra entries in `params` are ignored.
    ///
    /// # Errors
    ///
    /// [`RouteError::UnknownName`] when nothing is bound to `name`, or
    /// [`RouteError::MissingParam`] when a parameter has no value.
    pub fn url_for(&self, name: &str, params: &[(&str, &str)]) -> Result<String, RouteError> {
        let pattern = self
            .routes
            .get(name)
            .ok_or_else(|| RouteError::UnknownName(name.to_string()))?;
        pattern
            .expand(|param| {
                params
                    .iter()
                    .find(|(key, _)| *key == param)
                    .map(|(_, value)| (*value).to_string())
            })
            .map_err(|param| RouteError::MissingParam {
                name: name.to_string(),
                param: param.to_string(),
            })
    }

    /// Iterates over `(name, path)` pairs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.routes
            .iter()
            .map(|(name, pattern)| (name.as_str(), pattern.as_str()))
    }

    /// Number of names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns true if no name is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
