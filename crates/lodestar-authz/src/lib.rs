//! # Lodestar Authz
//!
//! Request-time security checks for the Lodestar dispatcher:
//!
//! - [`RolePolicy`] - path pattern to required role, filled while routes load
//! - [`AccessChecker`] and [`PrincipalResolver`] - who is calling and may they reach the path
//! - [`CsrfValidator`] - per-session token issuance and constant-time validation
//!
//! ```text
//!   request ──► PrincipalResolver ──► RolePolicy::check ──► (handler opted in?) ──► CsrfValidator
//!                                         │                                             │
//!                                      401 / 403                                       403
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod access;
pub mod csrf;
pub mod error;
mod policy;

pub use access::{AccessChecker, AnonymousResolver, PrincipalResolver, SessionPrincipalResolver};
pub use csrf::{generate_token, tokens_match, CsrfValidator};
pub use error::{AuthzError, AuthzResult};
pub use policy::{AccessDecision, Registration, RolePolicy, RoleRule};
