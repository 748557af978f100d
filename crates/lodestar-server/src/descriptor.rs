//! Declarative handler metadata.
//!
//! Each controller exposes its handlers as a static list of
//! [`HandlerDescriptor`]s. A descriptor carries everything the loader needs:
//! the verbs and paths it answers, an optional route name, the role it
//! requires, the middleware around it, whether it is CSRF protected, and how
//! its parameters are bound.
//!
//! ```rust
//! use lodestar_core::{handler_fn, Args, ParamSlot, Reply};
//! use lodestar_server::HandlerDescriptor;
//!
//! let save = HandlerDescriptor::new(
//!     "save",
//!     handler_fn(|_args: Args| async { Ok::<_, anyhow::Error>(Reply::Empty) }),
//! )
//! .get("/settings")
//! .named("settings")
//! .post("/settings")
//! .named("settings")
//! .requires_role("member")
//! .before(["audit"])
//! .csrf_protected()
//! .param(ParamSlot::Request);
//!
//! assert_eq!(save.routes().len(), 2);
//! assert!(save.is_csrf_protected());
//! ```

use std::fmt;

use http::Method;
use lodestar_core::{HandlerFn, ParamSlot};

/// One verb marker on a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSpec {
    /// HTTP method.
    pub method: Method,
    /// Path pattern.
    pub path: String,
    /// Optional route name.
    pub name: Option<String>,
}

/// Registration metadata for one handler.
#[derive(Clone)]
pub struct HandlerDescriptor {
    name: String,
    handler: HandlerFn,
    routes: Vec<RouteSpec>,
    role: Option<String>,
    before: Vec<String>,
    after: Vec<String>,
    csrf: bool,
    params: Vec<ParamSlot>,
}

impl HandlerDescriptor {
    /// Creates a descriptor for the handler `name`.
    #[must_use]
    pub fn new(name: impl Into<String>, handler: HandlerFn) -> Self {
        Self {
            name: name.into(),
            handler,
            routes: Vec::new(),
            role: None,
            before: Vec::new(),
            after: Vec::new(),
            csrf: false,
            params: Vec::new(),
        }
    }

    /// Binds the handler to `method` and `path`.
    #[must_use]
    pub fn route(mut self, method: Method, path: impl Into<String>) -> Self {
        self.routes.push(RouteSpec {
            method,
            path: path.into(),
            name: None,
        });
        self
    }

    /// Binds `GET path`.
    #[must_use]
    pub fn get(self, path: impl Into<String>) -> Self {
        self.route(Method::GET, path)
    }

    /// Binds `POST path`.
    #[must_use]
    pub fn post(self, path: impl Into<String>) -> Self {
        self.route(Method::POST, path)
    }

    /// Binds `PUT path`.
    #[must_use]
    pub fn put(self, path: impl Into<String>) -> Self {
        self.route(Method::PUT, path)
    }

    /// Binds `PATCH path`.
    #[must_use]
    pub fn patch(self, path: impl Into<String>) -> Self {
        self.route(Method::PATCH, path)
    }

    /// Binds `DELETE path`.
    #[must_use]
    pub fn delete(self, path: impl Into<String>) -> Self {
        self.route(Method::DELETE, path)
    }

    /// Binds `OPTIONS path`.
    #[must_use]
    pub fn options(self, path: impl Into<String>) -> Self {
        self.route(Method::OPTIONS, path)
    }

    /// Binds `HEAD path`.
    #[must_use]
    pub fn head(self, path: impl Into<String>) -> Self {
        self.route(Method::HEAD, path)
    }

    /// Names the most recently added route. Ignored if no route was added yet.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        if let Some(last) = self.routes.last_mut() {
            last.name = Some(name.into());
        }
        self
    }

    /// Requires `role` on every path of this handler.
    #[must_use]
    pub fn requires_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Appends before-middleware names, run in the given order.
    #[must_use]
    pub fn before<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.before.extend(names.into_iter().map(Into::into));
        self
    }

    /// Appends after-middleware names, run in the given order.
    #[must_use]
    pub fn after<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.after.extend(names.into_iter().map(Into::into));
        self
    }

    /// Opts the handler into CSRF validation.
    #[must_use]
    pub fn csrf_protected(mut self) -> Self {
        self.csrf = true;
        self
    }

    /// Appends a parameter slot.
    #[must_use]
    pub fn param(mut self, slot: ParamSlot) -> Self {
        self.params.push(slot);
        self
    }

    /// Handler name, unqualified.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The handler body.
    #[must_use]
    pub fn handler(&self) -> &HandlerFn {
        &self.handler
    }

    /// Verb markers in declaration order.
    #[must_use]
    pub fn routes(&self) -> &[RouteSpec] {
        &self.routes
    }

    /// Required role, if any.
    #[must_use]
    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    /// Before-middleware names.
    #[must_use]
    pub fn before_names(&self) -> &[String] {
        &self.before
    }

    /// After-middleware names.
    #[must_use]
    pub fn after_names(&self) -> &[String] {
        &self.after
    }

    /// Whether CSRF validation runs.
    #[must_use]
    pub fn is_csrf_protected(&self) -> bool {
        self.csrf
    }

    /// Parameter slots.
    #[must_use]
    pub fn params(&self) -> &[ParamSlot] {
        &self.params
    }
}

impl fmt::Debug for HandlerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDescriptor")
            .field("name", &self.name)
            .field("routes", &self.routes)
            .field("role", &self.role)
            .field("before", &self.before)
            .field("after", &self.after)
            .field("csrf", &self.csrf)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}
