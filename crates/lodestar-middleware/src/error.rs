//! Registry errors.

use thiserror::Error;

/// Failure while populating a [`MiddlewareRegistry`](crate::MiddlewareRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MiddlewareError {
    /// Another middleware already uses the name.
    #[error("middleware '{0}' is already registered")]
    Duplicate(String),

    /// Middleware names must not be empty.
    #[error("middleware name must not be empty")]
    EmptyName,
}
