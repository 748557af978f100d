//! Route definitions and ids.

use std::fmt;

use http::Method;

use crate::error::RouteError;
use crate::method_router::is_routable;
use crate::pattern::PathPattern;

/// Index of a route in its [`RouteTable`](crate::RouteTable).
///
/// Ids are assigned in registration order and stay stable for the lifetime
/// of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteId(usize);

impl RouteId {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Position of the route in registration order.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An HTTP method bound to a path pattern, optionally named.
///
/// Definitions are immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDefinition {
    method: Method,
    pattern: PathPattern,
    name: Option<String>,
}

impl RouteDefinition {
    /// Creates a definition for `method` on `path`.
    ///
    /// # Errors
    ///
    /// Fails when the method is not routable or the path is not a valid pattern.
    pub fn new(method: Method, path: &str) -> Result<Self, RouteError> {
        if !is_routable(&method) {
            return Err(RouteError::UnsupportedMethod(method));
        }
        Ok(Self {
            method,
            pattern: PathPattern::parse(path)?,
            name: None,
        })
    }

    /// Attaches a route name. Empty names are treated as no name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.name = (!name.is_empty()).then_some(name);
        self
    }

    /// The bound HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The path pattern as registered.
    #[must_use]
    pub fn path(&self) -> &str {
        self.pattern.as_str()
    }

    /// The parsed path pattern.
    #[must_use]
    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    /// The route name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl fmt::Display for RouteDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.pattern)?;
        if let Some(name) = &self.name {
            write!(f, " ({name})")?;
        }
        Ok(())
    }
}
