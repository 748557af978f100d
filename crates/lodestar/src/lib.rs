//! # Lodestar
//!
//! **Request dispatch core for server-rendered web applications**
//!
//! Lodestar turns controller declarations into a sealed route table and runs
//! every request through a fixed pipeline:
//!
//! - **Route loading** from controller descriptors, with named routes and
//!   reverse URL generation
//! - **Role-based access** checked on every request path
//! - **CSRF validation** for handlers that declare it
//! - **Named before/after middleware** per handler
//! - **One error translator** that decides what the client sees and keeps
//!   causes out of responses
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use lodestar::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::new()
//!         .with_defaults()
//!         .with_optional_file("lodestar.toml")?
//!         .with_env_prefix("LODESTAR")
//!         .load()?;
//!     lodestar::init_telemetry(&config)?;
//!
//!     let pages = ControllerDef::from_fn("Pages", |_| {
//!         Ok(vec![HandlerDescriptor::new(
//!             "home",
//!             handler_fn(|_args: Args| async { Ok::<_, anyhow::Error>(Reply::Html("<h1>Home</h1>".into())) }),
//!         )
//!         .get("/")
//!         .named("home")])
//!     });
//!
//!     App::builder(config).controller(pages).build()?.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Pipeline
//!
//! ```text
//! Request → Access check → Route lookup → CSRF → Before MW → Handler → After MW → Response
//!                 │              │           │         │          │          │
//!                 └──────────────┴───────────┴─────────┴──────────┴──────────┴──► ErrorTranslator
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod app;
pub mod settings;

pub use app::{App, AppBuilder, AppError};

pub use lodestar_authz as authz;
pub use lodestar_config as config;
pub use lodestar_core as core;
pub use lodestar_middleware as middleware;
pub use lodestar_router as router;
pub use lodestar_server as server;
pub use lodestar_telemetry as telemetry;

/// Installs logging and metrics as configured.
///
/// # Errors
///
/// Fails if a global subscriber is already installed or the exporter cannot
/// start.
pub fn init_telemetry(config: &lodestar_config::LodestarConfig) -> Result<(), AppError> {
    lodestar_telemetry::init_telemetry(&settings::telemetry_config(config))?;
    Ok(())
}

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use lodestar::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{App, AppBuilder, AppError};

    pub use lodestar_core::{
        handler_fn, handler_method, Args, Container, DispatchError, HandlerFn, InvocationFailure,
        ParamSlot, Principal, Reply, Request, Resolver, ResolverExt, Response, Session,
        UserDetails, UserDetailsService,
    };

    pub use lodestar_authz::{CsrfValidator, PrincipalResolver, RolePolicy};

    pub use lodestar_middleware::{
        ErrorRecord, ErrorSink, ErrorTranslator, FnMiddleware, Middleware, TranslatorConfig,
    };

    pub use lodestar_server::{
        Controller, ControllerDef, CsrfToken, Dispatcher, HandlerDescriptor, RouteHub, Server,
        ShutdownSignal,
    };

    pub use lodestar_config::{ConfigLoader, LodestarConfig};
}
