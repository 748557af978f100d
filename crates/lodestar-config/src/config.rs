//! The root configuration type.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::{
    ConfigError, ErrorsConfig, LogFormat, LoggingConfig, MetricsConfig, SecurityConfig,
    ServerConfig,
};

/// Complete Lodestar configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and the
/// environment.
///
/// # Example
///
/// ```
/// use lodestar_config::LodestarConfig;
///
/// let config = LodestarConfig::default();
/// assert_eq!(config.server.http_addr, "0.0.0.0:8080");
/// assert_eq!(config.errors.error_route, "/error");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct LodestarConfig {
    /// HTTP host settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// CSRF, session and login settings.
    #[serde(default)]
    pub security: SecurityConfig,

    /// Error route and user-facing messages.
    #[serde(default)]
    pub errors: ErrorsConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Metrics exporter settings.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl LodestarConfig {
    /// Validates cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.http_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::invalid_value(
                "server.http_addr",
                format!("invalid socket address: {}", self.server.http_addr),
            ));
        }

        if self.server.request_timeout_ms == 0 {
            return Err(ConfigError::invalid_value(
                "server.request_timeout_ms",
                "must be greater than zero",
            ));
        }

        if self.metrics.enabled && self.metrics.addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::invalid_value(
                "metrics.addr",
                format!("invalid socket address: {}", self.metrics.addr),
            ));
        }

        check_path("errors.error_route", &self.errors.error_route)?;
        if let Some(login) = &self.security.login_path {
            check_path("security.login_path", login)?;
        }

        let csrf = &self.security.csrf;
        for (field, value) in [
            ("security.csrf.session_key", &csrf.session_key),
            ("security.csrf.form_field", &csrf.form_field),
            ("security.sessions.cookie_name", &self.security.sessions.cookie_name),
        ] {
            if value.is_empty() {
                return Err(ConfigError::invalid_value(field, "must not be empty"));
            }
        }

        if csrf.header.is_empty()
            || !csrf
                .header
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            return Err(ConfigError::invalid_value(
                "security.csrf.header",
                format!("not a valid header name: {}", csrf.header),
            ));
        }

        Ok(())
    }

    /// Development preset: pretty `debug` logs, which include one line per
    /// registered route.
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config.logging.include_location = true;
        config
    }

    /// Production preset: JSON logs at `info`, secure session cookies.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;
        config.security.sessions.secure = true;
        config
    }
}

fn check_path(field: &str, value: &str) -> Result<(), ConfigError> {
    if !value.starts_with('/') || value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ConfigError::invalid_value(
            field,
            format!("must be an absolute path: {value}"),
        ));
    }
    Ok(())
}
