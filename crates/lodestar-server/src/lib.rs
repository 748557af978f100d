//! # Lodestar Server
//!
//! Route loading, request dispatch and the HTTP host.
//!
//! ```text
//! ControllerDef ──► RouteLoader ──► RoutingTable ──► RouteHub (swappable snapshot)
//!                                                        │
//! HTTP ──► Server ──► SessionStore ──► Dispatcher ◄──────┘
//!                                         │
//!                       access ─► CSRF ─► middleware ─► handler ─► middleware
//! ```
//!
//! - [`HandlerDescriptor`] and [`Controller`] declare handlers with their
//!   routes, role, middleware names, CSRF flag and parameter slots
//! - [`RouteLoader`] turns controllers into a [`RoutingTable`], skipping what
//!   cannot be registered and reporting it in a [`LoadReport`]
//! - [`RouteHub`] holds the live table and rebuilds it on [`RouteHub::reload`]
//! - [`Dispatcher`] runs one request through the pipeline
//! - [`Server`] hosts the dispatcher over HTTP/1 with graceful shutdown
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use lodestar_core::Container;
//! use lodestar_server::{Dispatcher, HostConfig, RouteHub, RouteLoader, Server};
//!
//! let resolver = Arc::new(Container::new());
//! let (hub, report) = RouteHub::new(RouteLoader::new(resolver.clone()), controllers())?;
//! let dispatcher = Dispatcher::builder(Arc::new(hub), resolver).build();
//! Server::new(HostConfig::default(), dispatcher).run().await?;
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod controller;
mod descriptor;
mod dispatcher;
mod error;
mod hub;
mod loader;
mod routing;
mod server;
mod session_store;
pub mod shutdown;

pub use config::{
    HostConfig, HostConfigBuilder, DEFAULT_HTTP_ADDR, DEFAULT_KEEP_ALIVE_SECS,
    DEFAULT_MAX_BODY_BYTES, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SHUTDOWN_TIMEOUT_SECS,
};
pub use controller::{Controller, ControllerDef, ControllerFactory};
pub use descriptor::{HandlerDescriptor, RouteSpec};
pub use dispatcher::{CsrfToken, Dispatcher, DispatcherBuilder};
pub use error::{LoadError, ServerError};
pub use hub::RouteHub;
pub use loader::{LoadReport, RouteLoader};
pub use routing::{HandlerBinding, MatchedRoute, Resolved, RouteListing, RoutingTable};
pub use server::{HttpResponse, Server};
pub use session_store::{CookieSession, SessionCookie, SessionStore};
pub use shutdown::{ConnectionToken, ConnectionTracker, ShutdownReceiver, ShutdownSignal};
