//! Errors raised while building the route table or the named route index.

use http::Method;
use thiserror::Error;

/// Failure to register or resolve a route.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// The path pattern could not be parsed.
    #[error("invalid path pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// The HTTP method is not one a route may be bound to.
    #[error("unsupported HTTP method {0}")]
    UnsupportedMethod(Method),

    /// Another route already owns this method and path.
    #[error("route {method} {path} is already registered")]
    Conflict {
        /// Method of the rejected route.
        method: Method,
        /// Pattern of the rejected route.
        path: String,
    },

    /// The route name is already bound to a different path.
    #[error("route name '{name}' is already bound to '{existing}', cannot rebind to '{attempted}'")]
    DuplicateName {
        /// The contested name.
        name: String,
        /// Path the name is bound to.
        existing: String,
        /// Path that tried to take the name.
        attempted: String,
    },

    /// No route carries this name.
    #[error("no route named '{0}'")]
    UnknownName(String),

    /// Reverse routing was asked to fill a pattern without a value for one of its parameters.
    #[error("route '{name}' needs a value for parameter '{param}'")]
    MissingParam {
        /// Route name.
        name: String,
        /// Parameter without a value.
        param: String,
    },
}

impl RouteError {
    pub(crate) fn invalid(pattern: &str, reason: &'static str) -> Self {
        Self::InvalidPattern {
            pattern: pattern.to_string(),
            reason,
        }
    }
}
