//! Route table and named route index for Lodestar.
//!
//! This crate holds the two routing registries the dispatcher reads on every
//! request:
//!
//! - [`RouteTable`]: a radix tree keyed by HTTP method and path pattern,
//!   yielding a [`RouteId`] plus captured [`Params`]
//! - [`NamedRoutes`]: route name to path pattern, with reverse URL
//!   generation through [`NamedRoutes::url_for`]
//!
//! Patterns are parsed once into a [`PathPattern`], which is also what the
//! role policy registry uses to decide which paths a role guards.
//!
//! # Example
//!
//! ```rust
//! use lodestar_router::{Lookup, RouteDefinition, RouteTable};
//! use http::Method;
//!
//! let mut table = RouteTable::new();
//! table.insert(RouteDefinition::new(Method::GET, "/users").unwrap()).unwrap();
//! table.insert(RouteDefinition::new(Method::GET, "/users/{id}").unwrap()).unwrap();
//! table.insert(RouteDefinition::new(Method::GET, "/files/*path").unwrap()).unwrap();
//!
//! let found = table.match_route(&Method::GET, "/users/123").unwrap();
//! assert_eq!(found.params.get("id"), Some("123"));
//!
//! assert!(matches!(table.lookup(&Method::POST, "/users"), Lookup::MethodNotAllowed(_)));
//! ```
//!
//! # Architecture
//!
//! ```text
//!                    (root)
//!                      │
//!              ┌───────┴───────┐
//!              │               │
//!            "users"        "files"
//!              │               │
//!        ┌─────┴─────┐      (wildcard)
//!        │           │         [GET]
//!      [GET]      (param)
//!                    │
//!                  [GET]
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod definition;
mod error;
mod method_router;
mod named;
mod node;
mod params;
mod pattern;
mod table;

pub use definition::{RouteDefinition, RouteId};
pub use error::RouteError;
pub use method_router::{is_routable, MethodRouter, ROUTABLE_METHODS};
pub use named::NamedRoutes;
pub use params::Params;
pub use pattern::{PathPattern, Segment};
pub use table::{Lookup, RouteTable};

/// A matched route and the parameters it captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    /// Id of the matched route.
    pub route: RouteId,
    /// Captured path parameters.
    pub params: Params,
}

impl RouteMatch {
    /// Creates a route match.
    #[must_use]
    pub fn new(route: RouteId, params: Params) -> Self {
        Self { route, params }
    }
}
