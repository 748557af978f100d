//! Load-time and host errors.

use lodestar_authz::AuthzError;
use lodestar_router::RouteError;
use thiserror::Error;

/// A controller or one of its routes could not be registered.
///
/// Every variant except [`LoadError::NoControllers`] is recovered by the
/// loader: it is logged, the offending unit is skipped and loading continues.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The controller factory failed.
    #[error("failed to instantiate controller '{controller}'")]
    Instantiation {
        /// Controller name.
        controller: String,
        /// What the factory raised.
        #[source]
        source: anyhow::Error,
    },

    /// A route could not be added to the table or the named index.
    #[error("failed to register route for '{handler}'")]
    Route {
        /// Qualified handler name.
        handler: String,
        /// Why.
        #[source]
        source: RouteError,
    },

    /// The handler's role declaration was rejected.
    #[error("failed to register role policy for '{handler}'")]
    Policy {
        /// Qualified handler name.
        handler: String,
        /// Why.
        #[source]
        source: AuthzError,
    },

    /// Controllers were configured but none of them could be instantiated.
    #[error("no controllers could be loaded")]
    NoControllers,
}

impl LoadError {
    /// Returns true when loading cannot continue.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::NoControllers)
    }
}

/// Failure of the HTTP host.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listener could not be bound.
    #[error("bind error: {0}")]
    Bind(String),

    /// I/O error while serving.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The routing table could not be built.
    #[error(transparent)]
    Load(#[from] LoadError),
}
