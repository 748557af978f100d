//! Application assembly.
//!
//! [`App::builder`] takes a validated [`LodestarConfig`], the services
//! controllers depend on, the controllers themselves and the named
//! middleware, and wires them into a [`Dispatcher`] over a loaded
//! [`RouteHub`].

use std::sync::Arc;

use lodestar_authz::{PrincipalResolver, SessionPrincipalResolver};
use lodestar_config::{ConfigError, LodestarConfig};
use lodestar_core::{Container, Resolver, UserDetailsService};
use lodestar_middleware::{
    ErrorSink, ErrorTranslator, FanoutSink, Middleware, MiddlewareError, MiddlewareRegistry,
    TracingSink,
};
use lodestar_server::{
    ControllerDef, Dispatcher, LoadError, LoadReport, RouteHub, RouteLoader, Server, ServerError,
    SessionStore, ShutdownSignal,
};
use lodestar_telemetry::TelemetryError;
use thiserror::Error;

use crate::settings;

/// Failure while assembling or running an [`App`].
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration did not validate.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A middleware could not be registered.
    #[error(transparent)]
    Middleware(#[from] MiddlewareError),

    /// Routes could not be loaded.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// The HTTP host failed.
    #[error(transparent)]
    Server(#[from] ServerError),

    /// Logging or metrics could not be installed.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
}

/// A fully wired application.
pub struct App {
    config: LodestarConfig,
    dispatcher: Dispatcher,
    report: LoadReport,
}

impl App {
    /// Starts an application from `config`.
    #[must_use]
    pub fn builder(config: LodestarConfig) -> AppBuilder {
        AppBuilder::new(config)
    }

    /// The configuration the app was built from.
    #[must_use]
    pub fn config(&self) -> &LodestarConfig {
        &self.config
    }

    /// The dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// The live route hub.
    #[must_use]
    pub fn hub(&self) -> &Arc<RouteHub> {
        self.dispatcher.hub()
    }

    /// What the initial route load did.
    #[must_use]
    pub fn load_report(&self) -> &LoadReport {
        &self.report
    }

    /// Wraps the dispatcher in an HTTP host with cookie sessions.
    #[must_use]
    pub fn into_server(self) -> Server {
        let host = settings::host_config(&self.config);
        let sessions = SessionStore::new(settings::session_cookie(&self.config));
        Server::new(host, self.dispatcher).with_sessions(sessions)
    }

    /// Serves until SIGTERM or SIGINT.
    ///
    /// # Errors
    ///
    /// Fails if the configured address cannot be bound.
    pub async fn run(self) -> Result<(), AppError> {
        self.into_server().run().await?;
        Ok(())
    }

    /// Serves until `shutdown` triggers.
    ///
    /// # Errors
    ///
    /// Fails if the configured address cannot be bound.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), AppError> {
        self.into_server().run_with_shutdown(shutdown).await?;
        Ok(())
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("dispatcher", &self.dispatcher)
            .field("report", &self.report)
            .finish_non_exhaustive()
    }
}

/// Builder for [`App`].
#[must_use]
pub struct AppBuilder {
    config: LodestarConfig,
    services: Container,
    controllers: Vec<ControllerDef>,
    middleware: Vec<Arc<dyn Middleware>>,
    principals: Option<Arc<dyn PrincipalResolver>>,
    sink: Option<Arc<dyn ErrorSink>>,
}

impl AppBuilder {
    fn new(config: LodestarConfig) -> Self {
        Self {
            config,
            services: Container::new(),
            controllers: Vec::new(),
            middleware: Vec::new(),
            principals: None,
            sink: None,
        }
    }

    /// Makes `service` available to controller factories and handler slots.
    pub fn service<T: Send + Sync + 'static>(mut self, service: Arc<T>) -> Self {
        self.services.register(service);
        self
    }

    /// Adds a controller.
    pub fn controller(mut self, controller: ControllerDef) -> Self {
        self.controllers.push(controller);
        self
    }

    /// Registers a named middleware.
    pub fn middleware(mut self, middleware: impl Middleware) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Resolves principals from the session's user id through `users`.
    pub fn users(mut self, users: Arc<dyn UserDetailsService>) -> Self {
        self.principals = Some(Arc::new(SessionPrincipalResolver::new(users)));
        self
    }

    /// Resolves principals with a custom resolver.
    pub fn principal_resolver(mut self, resolver: Arc<dyn PrincipalResolver>) -> Self {
        self.principals = Some(resolver);
        self
    }

    /// Sends error records to `sink` as well as to the log.
    pub fn error_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Validates the configuration, loads routes and builds the dispatcher.
    ///
    /// # Errors
    ///
    /// Fails on invalid configuration, duplicate middleware names, or when
    /// no controller could be instantiated.
    pub fn build(self) -> Result<App, AppError> {
        self.config.validate()?;

        let mut registry = MiddlewareRegistry::new();
        for middleware in self.middleware {
            registry.register_arc(middleware)?;
        }
        let registry = Arc::new(registry);

        let resolver: Arc<dyn Resolver> = Arc::new(self.services);
        let loader = RouteLoader::new(Arc::clone(&resolver)).with_middleware(Arc::clone(&registry));
        let (hub, report) = RouteHub::new(loader, self.controllers)?;

        let sink: Arc<dyn ErrorSink> = match self.sink {
            Some(extra) => Arc::new(FanoutSink::new().with(Arc::new(TracingSink)).with(extra)),
            None => Arc::new(TracingSink),
        };
        let translator =
            ErrorTranslator::new(settings::translator_config(&self.config)).with_sink(sink);

        let mut dispatcher = Dispatcher::builder(Arc::new(hub), resolver)
            .csrf(settings::csrf_validator(&self.config))
            .middleware(registry)
            .translator(translator);
        if let Some(principals) = self.principals {
            dispatcher = dispatcher.principal_resolver(principals);
        }

        tracing::info!(
            controllers = report.controllers_loaded,
            routes = report.routes_registered,
            skipped = report.skipped.len(),
            "Application assembled"
        );

        Ok(App {
            config: self.config,
            dispatcher: dispatcher.build(),
            report,
        })
    }
}

impl std::fmt::Debug for AppBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppBuilder")
            .field("controllers", &self.controllers.len())
            .field("middleware", &self.middleware.len())
            .finish_non_exhaustive()
    }
}
