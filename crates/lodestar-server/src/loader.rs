//! The route loader.
//!
//! Loading runs in two phases. First every controller factory is run; a
//! failing factory is logged and skipped. Then every handler of every loaded
//! controller is registered, one route per verb marker:
//!
//! 1. the route name is checked against the named index
//! 2. the declared role is added to the role policy
//! 3. the route is inserted into the table and its name bound
//!
//! The role rule therefore exists before the path becomes reachable. A route
//! that fails any step is logged and skipped without affecting its siblings.

use std::sync::Arc;

use lodestar_core::Resolver;
use lodestar_middleware::MiddlewareRegistry;
use lodestar_router::RouteDefinition;
use lodestar_telemetry::metrics;

use crate::controller::ControllerDef;
use crate::descriptor::{HandlerDescriptor, RouteSpec};
use crate::error::LoadError;
use crate::routing::{HandlerBinding, RoutingTable};

/// What a load did.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Controllers whose factory succeeded.
    pub controllers_loaded: usize,
    /// Names of controllers whose factory failed.
    pub failed_controllers: Vec<String>,
    /// Routes that became reachable.
    pub routes_registered: usize,
    /// Everything that was skipped, in the order it happened.
    pub skipped: Vec<LoadError>,
}

/// Builds a [`RoutingTable`] from controller definitions.
#[derive(Clone)]
pub struct RouteLoader {
    resolver: Arc<dyn Resolver>,
    middleware: Option<Arc<MiddlewareRegistry>>,
}

impl RouteLoader {
    /// Creates a loader whose factories resolve through `resolver`.
    #[must_use]
    pub fn new(resolver: Arc<dyn Resolver>) -> Self {
        Self {
            resolver,
            middleware: None,
        }
    }

    /// Checks middleware names against `registry` while loading.
    #[must_use]
    pub fn with_middleware(mut self, registry: Arc<MiddlewareRegistry>) -> Self {
        self.middleware = Some(registry);
        self
    }

    /// Loads `controllers` into a fresh table.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::NoControllers`] when controllers were given and
    /// every factory failed. All other failures are recovered and listed in
    /// the report.
    pub fn load(&self, controllers: &[ControllerDef]) -> Result<(RoutingTable, LoadReport), LoadError> {
        let mut table = RoutingTable::empty();
        let mut report = LoadReport::default();

        for def in controllers {
            let descriptors = match def.instantiate(self.resolver.as_ref()) {
                Ok(descriptors) => descriptors,
                Err(source) => {
                    tracing::error!(
                        controller = %def.name(),
                        error = ?source,
                        "Failed to instantiate controller"
                    );
                    report.failed_controllers.push(def.name().to_string());
                    report.skipped.push(LoadError::Instantiation {
                        controller: def.name().to_string(),
                        source,
                    });
                    continue;
                }
            };
            report.controllers_loaded += 1;

            for descriptor in descriptors {
                self.register_handler(&mut table, def.name(), &descriptor, &mut report);
            }
        }

        if !controllers.is_empty() && report.controllers_loaded == 0 {
            tracing::error!(attempted = controllers.len(), "No controllers could be loaded");
            return Err(LoadError::NoControllers);
        }

        tracing::info!(
            routes = report.routes_registered,
            skipped = report.skipped.len(),
            "Loaded {} controllers",
            report.controllers_loaded
        );
        metrics::record_routes_loaded(table.len());

        Ok((table, report))
    }

    fn register_handler(
        &self,
        table: &mut RoutingTable,
        controller: &str,
        descriptor: &HandlerDescriptor,
        report: &mut LoadReport,
    ) {
        let handler = format!("{controller}.{}", descriptor.name());
        self.warn_unknown_middleware(&handler, descriptor);

        let binding = Arc::new(HandlerBinding::new(
            handler.clone(),
            Arc::clone(descriptor.handler()),
            descriptor.params().to_vec(),
            descriptor.before_names().to_vec(),
            descriptor.after_names().to_vec(),
            descriptor.is_csrf_protected(),
            descriptor.role().map(ToString::to_string),
        ));

        if descriptor.routes().is_empty() {
            tracing::warn!(handler = %handler, "Handler declares no routes");
        }

        for spec in descriptor.routes() {
            match register_route(table, spec, &binding) {
                Ok(()) => report.routes_registered += 1,
                Err(err) => {
                    tracing::warn!(
                        handler = %handler,
                        method = %spec.method,
                        path = %spec.path,
                        error = ?err,
                        "Skipping route"
                    );
                    report.skipped.push(err);
                }
            }
        }
    }

    fn warn_unknown_middleware(&self, handler: &str, descriptor: &HandlerDescriptor) {
        let Some(registry) = &self.middleware else {
            return;
        };
        for (phase, names) in [
            ("before", descriptor.before_names()),
            ("after", descriptor.after_names()),
        ] {
            for name in registry.missing(names) {
                tracing::warn!(
                    handler = %handler,
                    middleware = %name,
                    phase,
                    "Handler references unregistered middleware"
                );
            }
        }
    }
}

impl std::fmt::Debug for RouteLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteLoader")
            .field("middleware", &self.middleware.is_some())
            .finish_non_exhaustive()
    }
}

fn register_route(
    table: &mut RoutingTable,
    spec: &RouteSpec,
    binding: &Arc<HandlerBinding>,
) -> Result<(), LoadError> {
    let handler = binding.handler();
    let route_error = |source| LoadError::Route {
        handler: handler.to_string(),
        source,
    };

    let mut definition = RouteDefinition::new(spec.method.clone(), &spec.path).map_err(route_error)?;
    if let Some(name) = &spec.name {
        table.check_name(name, &spec.path).map_err(route_error)?;
        definition = definition.named(name.clone());
    }
    table.check_route(&definition).map_err(route_error)?;

    if let Some(role) = binding.role() {
        table
            .require_role(&spec.path, role)
            .map_err(|source| LoadError::Policy {
                handler: handler.to_string(),
                source,
            })?;
    }

    table.bind(definition, Arc::clone(binding)).map_err(route_error)?;

    tracing::debug!(
        handler = %handler,
        role = binding.role().unwrap_or("-"),
        "Registered {} route: {} -> {}",
        spec.method,
        spec.name.as_deref().unwrap_or(handler),
        spec.path
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use lodestar_core::{handler_fn, Args, Container, Reply};
    use lodestar_middleware::FnMiddleware;
    use lodestar_router::RouteError;

    fn noop() -> lodestar_core::HandlerFn {
        handler_fn(|_args: Args| async { Ok::<_, anyhow::Error>(Reply::Empty) })
    }

    fn loader() -> RouteLoader {
        RouteLoader::new(Arc::new(Container::new()))
    }

    fn pages() -> ControllerDef {
        ControllerDef::from_fn("Pages", |_| {
            Ok(vec![
                HandlerDescriptor::new("home", noop()).get("/").named("home"),
                HandlerDescriptor::new("dashboard", noop())
                    .get("/dashboard")
                    .named("dashboard")
                    .requires_role("admin"),
            ])
        })
    }

    #[test]
    fn test_load_registers_routes_names_and_roles() {
        let (table, report) = loader().load(&[pages()]).unwrap();

        assert_eq!(report.controllers_loaded, 1);
        assert_eq!(report.routes_registered, 2);
        assert!(report.skipped.is_empty());
        assert_eq!(table.named().path("dashboard"), Some("/dashboard"));
        assert_eq!(table.policy().required_role("/dashboard"), Some("admin"));
        assert_eq!(table.listing()[1].handler, "Pages.dashboard");
    }

    #[test]
    fn test_multiple_verbs_share_one_binding() {
        let def = ControllerDef::from_fn("Forms", |_| {
            Ok(vec![HandlerDescriptor::new("contact", noop())
                .get("/contact")
                .named("contact")
                .post("/contact")
                .named("contact")])
        });
        let (table, report) = loader().load(&[def]).unwrap();

        assert_eq!(report.routes_registered, 2);
        assert_eq!(table.len(), 2);
        assert_eq!(table.named().len(), 1);
    }

    #[test]
    fn test_failing_factory_is_skipped() {
        let broken = ControllerDef::from_fn("Broken", |_| Err(anyhow::anyhow!("no database")));
        let (table, report) = loader().load(&[broken, pages()]).unwrap();

        assert_eq!(report.controllers_loaded, 1);
        assert_eq!(report.failed_controllers, ["Broken"]);
        assert!(matches!(report.skipped[0], LoadError::Instantiation { .. }));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_all_factories_failing_is_fatal() {
        let broken = ControllerDef::from_fn("Broken", |_| Err(anyhow::anyhow!("no database")));
        let err = loader().load(&[broken]).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_no_controllers_is_an_empty_table() {
        let (table, report) = loader().load(&[]).unwrap();
        assert!(table.is_empty());
        assert_eq!(report.controllers_loaded, 0);
    }

    #[test]
    fn test_duplicate_name_rejected_and_first_kept() {
        let def = ControllerDef::from_fn("Pages", |_| {
            Ok(vec![
                HandlerDescriptor::new("a", noop()).get("/a").named("page"),
                HandlerDescriptor::new("b", noop())
                    .get("/b")
                    .named("page")
                    .requires_role("admin"),
            ])
        });
        let (table, report) = loader().load(&[def]).unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.named().path("page"), Some("/a"));
        assert!(table.policy().is_empty());
        assert!(matches!(
            &report.skipped[0],
            LoadError::Route { source: RouteError::DuplicateName { .. }, .. }
        ));
    }

    #[test]
    fn test_invalid_pattern_skips_only_that_route() {
        let def = ControllerDef::from_fn("Pages", |_| {
            Ok(vec![HandlerDescriptor::new("bad", noop())
                .get("no-slash")
                .get("/good")])
        });
        let (table, report) = loader().load(&[def]).unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(report.skipped.len(), 1);
    }

    #[test]
    fn test_blank_role_is_a_policy_error() {
        let def = ControllerDef::from_fn("Pages", |_| {
            Ok(vec![HandlerDescriptor::new("x", noop()).get("/x").requires_role("  ")])
        });
        let (table, report) = loader().load(&[def]).unwrap();

        assert!(table.is_empty());
        assert!(matches!(report.skipped[0], LoadError::Policy { .. }));
    }

    #[test]
    fn test_unknown_middleware_still_loads() {
        let registry = MiddlewareRegistry::new()
            .with(FnMiddleware::new("audit", |_req, _res| async { Ok(()) }))
            .unwrap();
        let def = ControllerDef::from_fn("Pages", |_| {
            Ok(vec![HandlerDescriptor::new("x", noop())
                .get("/x")
                .before(["audit", "missing"])])
        });
        let (table, _) = loader()
            .with_middleware(Arc::new(registry))
            .load(&[def])
            .unwrap();

        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_reload_is_idempotent() {
        let loader = loader();
        let (first, _) = loader.load(&[pages()]).unwrap();
        let (second, _) = loader.load(&[pages()]).unwrap();

        assert_eq!(first.listing(), second.listing());
        assert_eq!(first.named(), second.named());
        assert_eq!(first.policy(), second.policy());
    }

    #[test]
    fn test_conflict_between_controllers() {
        let other = ControllerDef::from_fn("Other", |_| {
            Ok(vec![HandlerDescriptor::new("home", noop()).route(Method::GET, "/")])
        });
        let (table, report) = loader().load(&[pages(), other]).unwrap();

        assert_eq!(table.listing()[0].handler, "Pages.home");
        assert!(matches!(
            &report.skipped[0],
            LoadError::Route { source: RouteError::Conflict { .. }, .. }
        ));
    }

    #[test]
    fn test_conflicting_guarded_route_adds_no_role_rule() {
        let public = ControllerDef::from_fn("Public", |_| {
            Ok(vec![HandlerDescriptor::new("home", noop()).get("/")])
        });
        let admin = ControllerDef::from_fn("Admin", |_| {
            Ok(vec![HandlerDescriptor::new("home", noop())
                .get("/")
                .requires_role("admin")])
        });
        let (table, report) = loader().load(&[public, admin]).unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert!(table.policy().is_empty());
        assert_eq!(table.policy().required_role("/"), None);
        assert_eq!(table.policy().required_role("/about/anything"), None);
        assert_eq!(table.listing()[0].handler, "Public.home");
    }
}
