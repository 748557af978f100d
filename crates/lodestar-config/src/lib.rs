//! Typed configuration for Lodestar.
//!
//! - TOML and JSON files
//! - environment overrides
//! - strict parsing (unknown fields are errors)
//! - layering: defaults → file → env
//!
//! # Example
//!
//! ```no_run
//! use lodestar_config::ConfigLoader;
//!
//! # fn main() -> Result<(), lodestar_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_defaults()
//!     .with_file("lodestar.toml")?
//!     .with_env_prefix("LODESTAR")
//!     .load()?;
//!
//! println!("errors redirect to {}", config.errors.error_route);
//! # Ok(())
//! # }
//! ```
//!
//! # File format
//!
//! ```toml
//! [server]
//! http_addr = "0.0.0.0:8080"
//! request_timeout_ms = 30000
//!
//! [security]
//! login_path = "/login"
//!
//! [security.csrf]
//! form_field = "_csrf"
//! header = "x-csrf-token"
//!
//! [security.sessions]
//! cookie_name = "LODESTAR_SESSION"
//! ttl_secs = 1800
//!
//! [errors]
//! error_route = "/error"
//! generic_message = "An error occurred. Please try again."
//!
//! [logging]
//! level = "info"
//! format = "json"
//!
//! [metrics]
//! enabled = true
//! addr = "0.0.0.0:9090"
//! ```
//!
//! # Environment overrides
//!
//! `PREFIX__SECTION__KEY`, for example:
//!
//! - `LODESTAR__SERVER__HTTP_ADDR=0.0.0.0:9000`
//! - `LODESTAR__SECURITY__CSRF__HEADER=x-xsrf-token`
//! - `LODESTAR__ERRORS__ERROR_ROUTE=/oops`

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::LodestarConfig;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{
    CsrfConfig, ErrorsConfig, LogFormat, LoggingConfig, MetricsConfig, SecurityConfig,
    ServerConfig, SessionConfig,
};
