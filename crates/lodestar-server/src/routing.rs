//! The sealed routing table.
//!
//! A [`RoutingTable`] bundles the route table, the named route index, the
//! role policy and the handler binding of every route. The loader is the only
//! code that can write to one; once it hands the table out, the table is
//! read-only and shared by reference across requests.

use std::fmt;
use std::sync::Arc;

use http::Method;
use lodestar_authz::{AuthzResult, Registration, RolePolicy};
use lodestar_core::{HandlerFn, ParamSlot, Params};
use lodestar_router::{Lookup, NamedRoutes, RouteDefinition, RouteError, RouteId, RouteTable};

/// How a route reaches its handler.
pub struct HandlerBinding {
    handler: String,
    func: HandlerFn,
    params: Vec<ParamSlot>,
    before: Vec<String>,
    after: Vec<String>,
    csrf: bool,
    role: Option<String>,
}

impl HandlerBinding {
    pub(crate) fn new(
        handler: String,
        func: HandlerFn,
        params: Vec<ParamSlot>,
        before: Vec<String>,
        after: Vec<String>,
        csrf: bool,
        role: Option<String>,
    ) -> Self {
        Self {
            handler,
            func,
            params,
            before,
            after,
            csrf,
            role,
        }
    }

    /// Qualified handler name, `Controller.method`.
    #[must_use]
    pub fn handler(&self) -> &str {
        &self.handler
    }

    /// The handler body.
    #[must_use]
    pub fn func(&self) -> &HandlerFn {
        &self.func
    }

    /// Parameter slots, built once at registration.
    #[must_use]
    pub fn params(&self) -> &[ParamSlot] {
        &self.params
    }

    /// Before-middleware names.
    #[must_use]
    pub fn before(&self) -> &[String] {
        &self.before
    }

    /// After-middleware names.
    #[must_use]
    pub fn after(&self) -> &[String] {
        &self.after
    }

    /// Whether CSRF validation runs before the handler.
    #[must_use]
    pub fn csrf(&self) -> bool {
        self.csrf
    }

    /// Role declared on the handler.
    #[must_use]
    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }
}

impl fmt::Debug for HandlerBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerBinding")
            .field("handler", &self.handler)
            .field("params", &self.params)
            .field("before", &self.before)
            .field("after", &self.after)
            .field("csrf", &self.csrf)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

/// A route found for a request.
#[derive(Debug)]
pub struct MatchedRoute<'a> {
    /// The route definition.
    pub route: &'a RouteDefinition,
    /// Its binding.
    pub binding: &'a Arc<HandlerBinding>,
    /// Captured path parameters.
    pub params: Params,
}

/// Outcome of resolving a request against a [`RoutingTable`].
#[derive(Debug)]
pub enum Resolved<'a> {
    /// A route answers the method and path.
    Matched(MatchedRoute<'a>),
    /// The path is routed, but not for this method.
    MethodNotAllowed(Vec<Method>),
    /// Nothing is routed at this path.
    NotFound,
}

/// One line of [`RoutingTable::listing`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteListing {
    /// HTTP method.
    pub method: Method,
    /// Path pattern.
    pub path: String,
    /// Route name.
    pub name: Option<String>,
    /// Qualified handler name.
    pub handler: String,
}

/// Routes, names, role rules and bindings, frozen after load.
#[derive(Default)]
pub struct RoutingTable {
    routes: RouteTable,
    bindings: Vec<Arc<HandlerBinding>>,
    named: NamedRoutes,
    policy: RolePolicy,
}

impl RoutingTable {
    /// A table with no routes and no role rules.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn require_role(&mut self, pattern: &str, role: &str) -> AuthzResult<Registration> {
        self.policy.register(pattern, role)
    }

    pub(crate) fn check_name(&self, name: &str, path: &str) -> Result<(), RouteError> {
        self.named.check(name, path)
    }

    pub(crate) fn check_route(&self, definition: &RouteDefinition) -> Result<(), RouteError> {
        self.routes.check(definition)
    }

    /// Adds a route. The name, if any, is checked before the route is inserted
    /// and registered after, so a route rejected here leaves no name or binding
    /// behind. Role rules are the caller's to order.
    pub(crate) fn bind(
        &mut self,
        definition: RouteDefinition,
        binding: Arc<HandlerBinding>,
    ) -> Result<RouteId, RouteError> {
        let name = definition.name().map(ToString::to_string);
        let path = definition.path().to_string();
        if let Some(name) = &name {
            self.named.check(name, &path)?;
        }
        let id = self.routes.insert(definition)?;
        debug_assert_eq!(id.index(), self.bindings.len());
        self.bindings.push(binding);
        if let Some(name) = &name {
            self.named.register(name, &path)?;
        }
        Ok(id)
    }

    /// Resolves `method` and `path`.
    #[must_use]
    pub fn resolve(&self, method: &Method, path: &str) -> Resolved<'_> {
        match self.routes.lookup(method, path) {
            Lookup::Matched(found) => {
                match (self.routes.get(found.route), self.bindings.get(found.route.index())) {
                    (Some(route), Some(binding)) => Resolved::Matched(MatchedRoute {
                        route,
                        binding,
                        params: found.params,
                    }),
                    _ => Resolved::NotFound,
                }
            }
            Lookup::MethodNotAllowed(allowed) => Resolved::MethodNotAllowed(allowed),
            Lookup::NotFound => Resolved::NotFound,
        }
    }

    /// The role policy consulted for every request.
    #[must_use]
    pub fn policy(&self) -> &RolePolicy {
        &self.policy
    }

    /// The named route index.
    #[must_use]
    pub fn named(&self) -> &NamedRoutes {
        &self.named
    }

    /// Builds a URL for the route called `name`.
    pub fn url_for(&self, name: &str, params: &[(&str, &str)]) -> Result<String, RouteError> {
        self.named.url_for(name, params)
    }

    /// Every route with its handler, in registration order.
    #[must_use]
    pub fn listing(&self) -> Vec<RouteListing> {
        self.routes
            .iter()
            .map(|(id, def)| RouteListing {
                method: def.method().clone(),
                path: def.path().to_string(),
                name: def.name().map(ToString::to_string),
                handler: self
                    .bindings
                    .get(id.index())
                    .map(|b| b.handler().to_string())
                    .unwrap_or_default(),
            })
            .collect()
    }

    /// Number of routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns true if no route is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl fmt::Debug for RoutingTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutingTable")
            .field("routes", &self.routes.len())
            .field("named", &self.named.len())
            .field("role_rules", &self.policy.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lodestar_core::{handler_fn, Args, Reply};

    fn binding(handler: &str) -> Arc<HandlerBinding> {
        Arc::new(HandlerBinding::new(
            handler.to_string(),
            handler_fn(|_args: Args| async { Ok::<_, anyhow::Error>(Reply::Empty) }),
            Vec::new(),
            Vec::new(),
            Vec::new(),
            false,
            None,
        ))
    }

    fn def(method: Method, path: &str) -> RouteDefinition {
        RouteDefinition::new(method, path).unwrap()
    }

    #[test]
    fn test_bind_and_resolve() {
        let mut table = RoutingTable::empty();
        table
            .bind(def(Method::GET, "/users/{id}").named("user"), binding("Users.show"))
            .unwrap();

        match table.resolve(&Method::GET, "/users/7") {
            Resolved::Matched(found) => {
                assert_eq!(found.binding.handler(), "Users.show");
                assert_eq!(found.params.get("id"), Some("7"));
                assert_eq!(found.route.name(), Some("user"));
            }
            other => panic!("expected a match, got {other:?}"),
        }
        assert_eq!(table.url_for("user", &[("id", "7")]).unwrap(), "/users/7");
    }

    #[test]
    fn test_method_not_allowed_and_not_found() {
        let mut table = RoutingTable::empty();
        table.bind(def(Method::GET, "/a"), binding("A.get")).unwrap();

        assert!(matches!(
            table.resolve(&Method::POST, "/a"),
            Resolved::MethodNotAllowed(allowed) if allowed == vec![Method::GET]
        ));
        assert!(matches!(table.resolve(&Method::GET, "/b"), Resolved::NotFound));
    }

    #[test]
    fn test_duplicate_name_leaves_no_route() {
        let mut table = RoutingTable::empty();
        table
            .bind(def(Method::GET, "/first").named("page"), binding("A.first"))
            .unwrap();
        let err = table
            .bind(def(Method::GET, "/second").named("page"), binding("A.second"))
            .unwrap_err();

        assert!(matches!(err, RouteError::DuplicateName { .. }));
        assert_eq!(table.len(), 1);
        assert!(matches!(table.resolve(&Method::GET, "/second"), Resolved::NotFound));
        assert_eq!(table.named().path("page"), Some("/first"));
    }

    #[test]
    fn test_conflict_keeps_first_binding() {
        let mut table = RoutingTable::empty();
        table.bind(def(Method::GET, "/x"), binding("A.one")).unwrap();
        let err = table.bind(def(Method::GET, "/x"), binding("A.two")).unwrap_err();

        assert!(matches!(err, RouteError::Conflict { .. }));
        assert_eq!(table.listing()[0].handler, "A.one");
    }

    #[test]
    fn test_same_name_same_path_for_two_methods() {
        let mut table = RoutingTable::empty();
        table
            .bind(def(Method::GET, "/form").named("form"), binding("F.show"))
            .unwrap();
        table
            .bind(def(Method::POST, "/form").named("form"), binding("F.save"))
            .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.named().len(), 1);
    }

    #[test]
    fn test_listing_in_registration_order() {
        let mut table = RoutingTable::empty();
        table.bind(def(Method::GET, "/b"), binding("B.get")).unwrap();
        table.bind(def(Method::GET, "/a"), binding("A.get")).unwrap();

        let paths: Vec<_> = table.listing().into_iter().map(|l| l.path).collect();
        assert_eq!(paths, ["/b", "/a"]);
    }
}
