//! The route table.
//!
//! [`RouteTable`] owns every [`RouteDefinition`] and the radix tree used to
//! find them. A method and path pair can be bound once; the first
//! registration keeps it.

use http::Method;

use crate::definition::{RouteDefinition, RouteId};
use crate::error::RouteError;
use crate::node::Node;
use crate::params::Params;
use crate::pattern::decode_capture;
use crate::RouteMatch;

/// Outcome of looking up a request against the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// A route is bound to the method and path.
    Matched(RouteMatch),
    /// The path exists but not for this method; carries the allowed methods.
    MethodNotAllowed(Vec<Method>),
    /// No route pattern matches the path.
    NotFound,
}

/// Registry of routes keyed by method and path pattern.
///
/// # Example
///
/// ```rust
/// use lodestar_router::{RouteDefinition, RouteTable};
/// use http::Method;
///
/// let mut table = RouteTable::new();
/// table.insert(RouteDefinition::new(Method::GET, "/users/{id}").unwrap()).unwrap();
///
/// let found = table.match_route(&Method::GET, "/users/123").unwrap();
/// assert_eq!(found.params.get("id"), Some("123"));
/// ```
///
/// # Route Priority
///
/// Static segments beat parameters, which beat wildcards, so `/users/me`
/// wins over `/users/{id}` for the path `/users/me`.
#[derive(Debug, Clone)]
pub struct RouteTable {
    root: Node,
    routes: Vec<RouteDefinition>,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: Node::root(),
            routes: Vec::new(),
        }
    }

    /// Registers a route.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::Conflict`] when the method is already bound on
    /// an equivalent path. The table is unchanged in that case.
    pub fn insert(&mut self, definition: RouteDefinition) -> Result<RouteId, RouteError> {
        let id = RouteId::new(self.routes.len());
        self.root
            .insert(definition.pattern().segments(), definition.method(), id)
            .map_err(|_| RouteError::Conflict {
                method: definition.method().clone(),
                path: definition.path().to_string(),
            })?;
        self.routes.push(definition);
        Ok(id)
    }

    /// Checks that `definition` could be inserted without touching the table.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::Conflict`] when [`RouteTable::insert`] would.
    pub fn check(&self, definition: &RouteDefinition) -> Result<(), RouteError> {
        match self
            .root
            .bound(definition.pattern().segments(), definition.method())
        {
            Some(_) => Err(RouteError::Conflict {
                method: definition.method().clone(),
                path: definition.path().to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Looks up `method` and `path`.
    #[must_use]
    pub fn lookup(&self, method: &Method, path: &str) -> Lookup {
        let Some((methods, captures)) = self.root.find(path) else {
            return Lookup::NotFound;
        };
        let Some(id) = methods.resolve(method) else {
            return Lookup::MethodNotAllowed(methods.allowed_methods());
        };
        let params: Params = self.routes[id.index()]
            .pattern()
            .capture_names()
            .zip(captures.iter().map(|raw| decode_capture(raw)))
            .collect();
        Lookup::Matched(RouteMatch::new(id, params))
    }

    /// Returns the matching route, if any.
    #[must_use]
    pub fn match_route(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        match self.lookup(method, path) {
            Lookup::Matched(found) => Some(found),
            _ => None,
        }
    }

    /// Returns the definition registered under `id`.
    #[must_use]
    pub fn get(&self, id: RouteId) -> Option<&RouteDefinition> {
        self.routes.get(id.index())
    }

    /// Iterates over routes in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (RouteId, &RouteDefinition)> {
        self.routes
            .iter()
            .enumerate()
            .map(|(i, def)| (RouteId::new(i), def))
    }

    /// Number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(method: Method, path: &str) -> RouteDefinition {
        RouteDefinition::new(method, path).unwrap()
    }

    #[test]
    fn test_table_new() {
        let table = RouteTable::new();
        assert!(table.is_empty());
        assert_eq!(table.lookup(&Method::GET, "/"), Lookup::NotFound);
    }

    #[test]
    fn test_ids_follow_registration_order() {
        let mut table = RouteTable::new();
        let a = table.insert(def(Method::GET, "/a")).unwrap();
        let b = table.insert(def(Method::POST, "/a")).unwrap();
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(table.get(b).unwrap().method(), &Method::POST);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_params_use_winning_route_names() {
        let mut table = RouteTable::new();
        table.insert(def(Method::GET, "/users/{id}")).unwrap();
        table.insert(def(Method::POST, "/users/{user_id}")).unwrap();

        let get = table.match_route(&Method::GET, "/users/5").unwrap();
        assert_eq!(get.params.get("id"), Some("5"));

        let post = table.match_route(&Method::POST, "/users/5").unwrap();
        assert_eq!(post.params.get("user_id"), Some("5"));
        assert_eq!(post.params.get("id"), None);
    }

    #[test]
    fn test_conflict_leaves_first_route() {
        let mut table = RouteTable::new();
        let first = table.insert(def(Method::GET, "/users/{id}")).unwrap();
        let err = table.insert(def(Method::GET, "/users/{uid}")).unwrap_err();

        assert_eq!(
            err,
            RouteError::Conflict {
                method: Method::GET,
                path: "/users/{uid}".to_string()
            }
        );
        assert_eq!(table.len(), 1);
        assert_eq!(table.match_route(&Method::GET, "/users/1").unwrap().route, first);
    }

    #[test]
    fn test_check_reports_conflict_without_inserting() {
        let mut table = RouteTable::new();
        table.insert(def(Method::GET, "/users/{id}")).unwrap();

        assert!(table.check(&def(Method::POST, "/users/{id}")).is_ok());
        assert!(table.check(&def(Method::GET, "/users/me")).is_ok());
        assert!(matches!(
            table.check(&def(Method::GET, "/users/{uid}")),
            Err(RouteError::Conflict { .. })
        ));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_method_not_allowed_lists_methods() {
        let mut table = RouteTable::new();
        table.insert(def(Method::GET, "/login")).unwrap();
        table.insert(def(Method::POST, "/login")).unwrap();

        assert_eq!(
            table.lookup(&Method::DELETE, "/login"),
            Lookup::MethodNotAllowed(vec![Method::GET, Method::POST])
        );
    }

    #[test]
    fn test_head_uses_get_route() {
        let mut table = RouteTable::new();
        let id = table.insert(def(Method::GET, "/health")).unwrap();
        assert_eq!(table.match_route(&Method::HEAD, "/health").unwrap().route, id);
    }

    #[test]
    fn test_iter_in_order() {
        let mut table = RouteTable::new();
        table.insert(def(Method::GET, "/b")).unwrap();
        table.insert(def(Method::GET, "/a")).unwrap();
        let paths: Vec<&str> = table.iter().map(|(_, d)| d.path()).collect();
        assert_eq!(paths, vec!["/b", "/a"]);
    }
}
