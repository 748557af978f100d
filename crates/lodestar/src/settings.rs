//! Maps [`LodestarConfig`] onto the settings each crate takes.

use std::time::Duration;

use lodestar_authz::CsrfValidator;
use lodestar_config::{LodestarConfig, LogFormat};
use lodestar_middleware::TranslatorConfig;
use lodestar_server::{HostConfig, SessionCookie};
use lodestar_telemetry::{LogConfig, MetricsConfig, TelemetryConfig};

/// HTTP host settings. A connection cap of zero means unlimited.
#[must_use]
pub fn host_config(config: &LodestarConfig) -> HostConfig {
    let server = &config.server;
    let max_connections = match server.max_connections {
        0 => None,
        max => usize::try_from(max).ok(),
    };
    HostConfig::builder()
        .http_addr(server.http_addr.clone())
        .shutdown_timeout(Duration::from_secs(server.shutdown_timeout_secs))
        .request_timeout(Duration::from_millis(server.request_timeout_ms))
        .keep_alive_timeout(server.keep_alive_secs.map(Duration::from_secs))
        .max_connections(max_connections)
        .max_body_bytes(server.max_body_bytes)
        .build()
}

/// Messages and redirect targets for the error translator.
#[must_use]
pub fn translator_config(config: &LodestarConfig) -> TranslatorConfig {
    let errors = &config.errors;
    TranslatorConfig {
        error_route: errors.error_route.clone(),
        generic_message: errors.generic_message.clone(),
        csrf_message: errors.csrf_message.clone(),
        unauthenticated_message: errors.unauthenticated_message.clone(),
        forbidden_message: errors.forbidden_message.clone(),
        login_path: config.security.login_path.clone(),
    }
}

/// CSRF validator using the configured key, field and header.
#[must_use]
pub fn csrf_validator(config: &LodestarConfig) -> CsrfValidator {
    let csrf = &config.security.csrf;
    CsrfValidator::new()
        .with_session_key(csrf.session_key.clone())
        .with_form_field(csrf.form_field.clone())
        .with_header(csrf.header.clone())
}

/// Session cookie attributes.
#[must_use]
pub fn session_cookie(config: &LodestarConfig) -> SessionCookie {
    let sessions = &config.security.sessions;
    SessionCookie {
        name: sessions.cookie_name.clone(),
        ttl: Duration::from_secs(sessions.ttl_secs),
        secure: sessions.secure,
    }
}

/// Logging and metrics settings.
#[must_use]
pub fn telemetry_config(config: &LodestarConfig) -> TelemetryConfig {
    let logging = &config.logging;
    let base = match logging.format {
        LogFormat::Json => LogConfig::production(),
        LogFormat::Pretty => LogConfig::development(),
    };
    TelemetryConfig {
        logging: LogConfig {
            enabled: logging.enabled,
            file_line_info: logging.include_location,
            ..base.with_level(logging.level.clone())
        },
        metrics: MetricsConfig {
            enabled: config.metrics.enabled,
            addr: config.metrics.addr.clone(),
            duration_buckets: config.metrics.histogram_buckets.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_config_from_defaults() {
        let config = LodestarConfig::default();
        let host = host_config(&config);

        assert_eq!(host.http_addr(), config.server.http_addr);
        assert_eq!(host.request_timeout(), Duration::from_millis(config.server.request_timeout_ms));
        assert_eq!(host.max_body_bytes(), config.server.max_body_bytes);
    }

    #[test]
    fn test_zero_connection_cap_is_unlimited() {
        let mut config = LodestarConfig::default();
        config.server.max_connections = 0;
        assert!(host_config(&config).max_connections().is_none());

        config.server.max_connections = 8;
        assert_eq!(host_config(&config).max_connections(), Some(8));
    }

    #[test]
    fn test_translator_takes_login_path() {
        let mut config = LodestarConfig::default();
        config.security.login_path = Some("/login".to_string());
        config.errors.error_route = "/oops".to_string();

        let translator = translator_config(&config);
        assert_eq!(translator.login_path.as_deref(), Some("/login"));
        assert_eq!(translator.error_route, "/oops");
    }

    #[test]
    fn test_csrf_form_field() {
        let mut config = LodestarConfig::default();
        config.security.csrf.form_field = "authenticity_token".to_string();
        assert_eq!(csrf_validator(&config).form_field(), "authenticity_token");
    }

    #[test]
    fn test_pretty_logging_keeps_level() {
        let mut config = LodestarConfig::default();
        config.logging.format = LogFormat::Pretty;
        config.logging.level = "warn".to_string();

        let telemetry = telemetry_config(&config);
        assert!(!telemetry.logging.json_format);
        assert_eq!(telemetry.logging.level, "warn");
        assert_eq!(telemetry.metrics.duration_buckets, config.metrics.histogram_buckets);
    }

    #[test]
    fn test_session_cookie() {
        let mut config = LodestarConfig::default();
        config.security.sessions.secure = true;
        let cookie = session_cookie(&config);
        assert!(cookie.secure);
        assert_eq!(cookie.ttl, Duration::from_secs(config.security.sessions.ttl_secs));
    }
}
