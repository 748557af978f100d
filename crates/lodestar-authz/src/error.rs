//! Error types for the authorization registries.

use lodestar_router::RouteError;
use thiserror::Error;

/// Result type for authorization registry operations.
pub type AuthzResult<T> = Result<T, AuthzError>;

/// Failure to register a role policy entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthzError {
    /// The pattern is not a valid path pattern.
    #[error("invalid role pattern: {0}")]
    InvalidPattern(#[from] RouteError),

    /// A blank role was declared for a pattern.
    #[error("empty role declared for '{pattern}'")]
    EmptyRole {
        /// The guarded pattern.
        pattern: String,
    },
}

impl AuthzError {
    /// Returns true if the error came from the pattern rather than the role.
    #[must_use]
    pub const fn is_pattern_error(&self) -> bool {
        matches!(self, Self::InvalidPattern(_))
    }
}
