//! # Lodestar Core
//!
//! Types shared by every stage of the Lodestar dispatch pipeline:
//!
//! - [`Request`] and [`Response`] - the per-request carriers handed to middleware and handlers
//! - [`Session`] - the session boundary used for flash messages and CSRF tokens
//! - [`Principal`], [`UserDetails`], [`UserDetailsService`] - identity and user lookup
//! - [`Container`] and [`Resolver`] - the dependency lookup capability
//! - [`ParamSlot`], [`Args`], [`Reply`], [`HandlerFn`] - explicit handler bindings
//! - [`DispatchError`] and [`InvocationFailure`] - the per-request failure taxonomy

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
pub mod di;
mod error;
pub mod fixtures;
mod handler;
mod principal;
mod response;
mod session;

pub use context::{Request, RequestBuilder, RequestId};
pub use di::{Container, InjectionError, Resolver, ResolverExt, ServiceKey};
pub use error::{
    DenialReason, DispatchError, ErrorCategory, FailureKind, InvocationFailure, MiddlewarePhase,
};
pub use handler::{
    handler_fn, handler_method, Arg, ArgError, Args, BoxFuture, HandlerFn, ParamSlot, Reply,
};
pub use principal::{Principal, UserDetails, UserDetailsService};
pub use response::Response;
pub use session::{MemorySession, Session, FLASH_ERROR_KEY, USER_ID_KEY};

pub use lodestar_router::Params;
