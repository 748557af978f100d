//! Per-request failure taxonomy.
//!
//! Every stage of the dispatch pipeline returns a [`DispatchError`] instead of
//! writing an error response itself. The error translator is the one place
//! that decides what the client sees; it uses [`DispatchError::category`] and
//! [`DispatchError::status_code`] for that and logs the original cause.
//!
//! | Variant | Category | Status |
//! |---|---|---|
//! | `AccessDenied` (unauthenticated) | client | 401 |
//! | `AccessDenied` (insufficient role) | client | 403 |
//! | `Csrf` | client | 403 |
//! | `Middleware`, `UnknownMiddleware` | server | 500 |
//! | `Resolution` | server | 500 |
//! | `Handler` | from the original cause, else unknown | 500 |

use std::fmt;

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::di::InjectionError;
use crate::handler::ArgError;

/// Who caused a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Validation or security failures caused by the client.
    Client,
    /// Resolution and framework failures on the server side.
    Server,
    /// Anything raised by application code that is not classified.
    Unknown,
}

/// Pipeline stage a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Access control rejected the request.
    AccessDenied,
    /// CSRF validation failed.
    Csrf,
    /// A before or after middleware failed or was not registered.
    Middleware,
    /// A handler parameter could not be resolved.
    Resolution,
    /// The handler body failed.
    Handler,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AccessDenied => "access_denied",
            Self::Csrf => "csrf",
            Self::Middleware => "middleware",
            Self::Resolution => "resolution",
            Self::Handler => "handler",
        })
    }
}

/// Why access control rejected a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum DenialReason {
    /// No authenticated principal.
    Unauthenticated,
    /// The principal lacks the required role.
    InsufficientRole {
        /// Role the path requires.
        required: String,
    },
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthenticated => f.write_str("unauthenticated"),
            Self::InsufficientRole { required } => write!(f, "role '{required}' required"),
        }
    }
}

/// Whether a middleware ran before or after the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MiddlewarePhase {
    /// Runs before the handler.
    Before,
    /// Runs after the handler.
    After,
}

impl fmt::Display for MiddlewarePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Before => "before",
            Self::After => "after",
        })
    }
}

/// A handler body failed.
///
/// The dispatcher wraps every handler error in one of these so the
/// translator can tell handler failures from framework failures. Wrappers may
/// nest; [`into_original_cause`](Self::into_original_cause) strips all of them.
#[derive(Debug, Error)]
#[error("handler '{handler}' failed")]
pub struct InvocationFailure {
    handler: String,
    #[source]
    cause: anyhow::Error,
}

impl InvocationFailure {
    /// Wraps `cause` raised by `handler`.
    pub fn new(handler: impl Into<String>, cause: impl Into<anyhow::Error>) -> Self {
        Self {
            handler: handler.into(),
            cause: cause.into(),
        }
    }

    /// Name of the handler that failed.
    #[must_use]
    pub fn handler(&self) -> &str {
        &self.handler
    }

    /// The innermost cause, looking through nested wrappers.
    #[must_use]
    pub fn original_cause(&self) -> &anyhow::Error {
        let mut cause = &self.cause;
        while let Some(inner) = cause.downcast_ref::<InvocationFailure>() {
            cause = &inner.cause;
        }
        cause
    }

    /// Consumes the wrapper and returns the innermost cause.
    #[must_use]
    pub fn into_original_cause(self) -> anyhow::Error {
        let mut cause = self.cause;
        loop {
            match cause.downcast::<InvocationFailure>() {
                Ok(inner) => cause = inner.cause,
                Err(original) => return original,
            }
        }
    }
}

/// Failure of one request in the dispatch pipeline.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The request may not reach the path.
    #[error("access to {path} denied: {reason}")]
    AccessDenied {
        /// Request path.
        path: String,
        /// Why.
        reason: DenialReason,
    },

    /// The handler demands a CSRF token and the request did not carry the right one.
    #[error("CSRF validation failed for {handler}")]
    Csrf {
        /// Handler that rejected the request.
        handler: String,
    },

    /// A named middleware returned an error.
    #[error("{phase} middleware '{name}' failed")]
    Middleware {
        /// Middleware name.
        name: String,
        /// When it ran.
        phase: MiddlewarePhase,
        /// What it raised.
        #[source]
        source: anyhow::Error,
    },

    /// A handler referenced a middleware name nobody registered.
    #[error("{phase} middleware '{name}' is not registered")]
    UnknownMiddleware {
        /// Middleware name.
        name: String,
        /// Where it was referenced.
        phase: MiddlewarePhase,
    },

    /// A handler parameter could not be resolved.
    #[error(transparent)]
    Resolution(#[from] InjectionError),

    /// The handler body failed.
    #[error(transparent)]
    Handler(#[from] InvocationFailure),
}

impl DispatchError {
    /// Pipeline stage that failed.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::AccessDenied { .. } => FailureKind::AccessDenied,
            Self::Csrf { .. } => FailureKind::Csrf,
            Self::Middleware { .. } | Self::UnknownMiddleware { .. } => FailureKind::Middleware,
            Self::Resolution(_) => FailureKind::Resolution,
            Self::Handler(_) => FailureKind::Handler,
        }
    }

    /// Classifies the failure.
    ///
    /// Handler failures are classified by their original cause when it is a
    /// known framework error, and are [`ErrorCategory::Unknown`] otherwise.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::AccessDenied { .. } | Self::Csrf { .. } => ErrorCategory::Client,
            Self::Middleware { .. } | Self::UnknownMiddleware { .. } | Self::Resolution(_) => {
                ErrorCategory::Server
            }
            Self::Handler(failure) => classify_cause(failure.original_cause()),
        }
    }

    /// Status code the client should see.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::AccessDenied {
                reason: DenialReason::Unauthenticated,
                ..
            } => StatusCode::UNAUTHORIZED,
            Self::AccessDenied { .. } | Self::Csrf { .. } => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns true for failures raised inside a handler body.
    #[must_use]
    pub const fn is_handler_failure(&self) -> bool {
        matches!(self, Self::Handler(_))
    }

    /// Converts the failure into the cause that should be logged.
    ///
    /// Handler failures yield their original cause; every other failure is
    /// its own cause.
    #[must_use]
    pub fn into_cause(self) -> anyhow::Error {
        match self {
            Self::Handler(failure) => failure.into_original_cause(),
            other => anyhow::Error::new(other),
        }
    }
}

fn classify_cause(cause: &anyhow::Error) -> ErrorCategory {
    if let Some(inner) = cause.downcast_ref::<DispatchError>() {
        return inner.category();
    }
    if cause.is::<InjectionError>() || cause.is::<ArgError>() {
        return ErrorCategory::Server;
    }
    ErrorCategory::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::di::ServiceKey;

    #[derive(Debug, Error)]
    #[error("disk on fire")]
    struct DiskError;

    #[test]
    fn test_unwraps_nested_invocation_failures() {
        let inner = InvocationFailure::new("inner", DiskError);
        let outer = InvocationFailure::new("outer", inner);

        assert!(outer.original_cause().is::<DiskError>());
        let cause = outer.into_original_cause();
        assert!(cause.downcast_ref::<DiskError>().is_some());
        assert!(cause.downcast_ref::<InvocationFailure>().is_none());
    }

    #[test]
    fn test_status_codes() {
        let unauthenticated = DispatchError::AccessDenied {
            path: "/admin".into(),
            reason: DenialReason::Unauthenticated,
        };
        let forbidden = DispatchError::AccessDenied {
            path: "/admin".into(),
            reason: DenialReason::InsufficientRole {
                required: "admin".into(),
            },
        };
        let csrf = DispatchError::Csrf {
            handler: "Forms.submit".into(),
        };
        let handler = DispatchError::from(InvocationFailure::new("h", DiskError));

        assert_eq!(unauthenticated.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(csrf.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(handler.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_categories() {
        let csrf = DispatchError::Csrf { handler: "h".into() };
        let resolution =
            DispatchError::from(InjectionError::not_registered(&ServiceKey::of::<DiskError>()));
        let unknown = DispatchError::from(InvocationFailure::new("h", DiskError));
        let classified = DispatchError::from(InvocationFailure::new(
            "h",
            InjectionError::not_registered(&ServiceKey::of::<DiskError>()),
        ));

        assert_eq!(csrf.category(), ErrorCategory::Client);
        assert_eq!(resolution.category(), ErrorCategory::Server);
        assert_eq!(unknown.category(), ErrorCategory::Unknown);
        assert_eq!(classified.category(), ErrorCategory::Server);
        assert_eq!(unknown.kind(), FailureKind::Handler);
        assert!(unknown.is_handler_failure());
    }

    #[test]
    fn test_into_cause() {
        let handler = DispatchError::from(InvocationFailure::new("h", DiskError));
        assert!(handler.into_cause().is::<DiskError>());

        let middleware = DispatchError::UnknownMiddleware {
            name: "audit".into(),
            phase: MiddlewarePhase::Before,
        };
        let cause = middleware.into_cause();
        assert_eq!(cause.to_string(), "before middleware 'audit' is not registered");
    }
}
