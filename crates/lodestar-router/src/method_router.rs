//! Per-path method slots.
//!
//! [`MethodRouter`] maps each routable HTTP method to the [`RouteId`] bound
//! at one path node. Only the seven verbs a handler may declare have slots.

use http::Method;

use crate::definition::RouteId;

/// Methods a route may be bound to, in the order reported by `Allow`.
pub const ROUTABLE_METHODS: [Method; 7] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::OPTIONS,
    Method::HEAD,
];

/// Returns true when routes may be bound to `method`.
#[must_use]
pub fn is_routable(method: &Method) -> bool {
    ROUTABLE_METHODS.contains(method)
}

/// Maps HTTP methods to route ids for a single path.
///
/// # Example
///
/// ```rust
/// use lodestar_router::{MethodRouter, RouteTable, RouteDefinition};
/// use http::Method;
///
/// let mut table = RouteTable::new();
/// let id = table.insert(RouteDefinition::new(Method::GET, "/users").unwrap()).unwrap();
///
/// let mut router = MethodRouter::new();
/// router.insert(&Method::GET, id).unwrap();
/// assert_eq!(router.get(&Method::GET), Some(id));
/// assert_eq!(router.get(&Method::POST), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodRouter {
    get: Option<RouteId>,
    post: Option<RouteId>,
    put: Option<RouteId>,
    patch: Option<RouteId>,
    delete: Option<RouteId>,
    options: Option<RouteId>,
    head: Option<RouteId>,
}

impl MethodRouter {
    /// Creates an empty method router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, method: &Method) -> Option<&Option<RouteId>> {
        match *method {
            Method::GET => Some(&self.get),
            Method::POST => Some(&self.post),
            Method::PUT => Some(&self.put),
            Method::PATCH => Some(&self.patch),
            Method::DELETE => Some(&self.delete),
            Method::OPTIONS => Some(&self.options),
            Method::HEAD => Some(&self.head),
            _ => None,
        }
    }

    fn slot_mut(&mut self, method: &Method) -> Option<&mut Option<RouteId>> {
        match *method {
            Method::GET => Some(&mut self.get),
            Method::POST => Some(&mut self.post),
            Method::PUT => Some(&mut self.put),
            Method::PATCH => Some(&mut self.patch),
            Method::DELETE => Some(&mut self.delete),
            Method::OPTIONS => Some(&mut self.options),
            Method::HEAD => Some(&mut self.head),
            _ => None,
        }
    }

    /// Binds `method` to `id`.
    ///
    /// The first binding for a method wins; a second attempt returns the id
    /// that already owns the slot. Unroutable methods are ignored.
    pub fn insert(&mut self, method: &Method, id: RouteId) -> Result<(), RouteId> {
        match self.slot_mut(method) {
            Some(Some(existing)) => Err(*existing),
            Some(slot) => {
                *slot = Some(id);
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Returns the route bound to `method`.
    #[must_use]
    pub fn get(&self, method: &Method) -> Option<RouteId> {
        self.slot(method).copied().flatten()
    }

    /// Returns the route for `method`, letting HEAD fall back to GET.
    #[must_use]
    pub fn resolve(&self, method: &Method) -> Option<RouteId> {
        self.get(method).or_else(|| {
            if *method == Method::HEAD {
                self.get
            } else {
                None
            }
        })
    }

    /// Returns true if any method is bound.
    #[must_use]
    pub fn has_any_method(&self) -> bool {
        ROUTABLE_METHODS.iter().any(|m| self.get(m).is_some())
    }

    /// Returns the bound methods in `Allow` header order.
    #[must_use]
    pub fn allowed_methods(&self) -> Vec<Method> {
        ROUTABLE_METHODS
            .iter()
            .filter(|m| self.get(m).is_some())
            .cloned()
            .collect()
    }
}
