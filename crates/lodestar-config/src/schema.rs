//! Configuration sections.

use serde::{Deserialize, Serialize};

/// HTTP host settings.
///
/// # Example
///
/// ```
/// use lodestar_config::ServerConfig;
///
/// let config = ServerConfig {
///     http_addr: "127.0.0.1:3000".to_string(),
///     ..Default::default()
/// };
/// assert_eq!(config.request_timeout_ms, 30_000);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_http_addr")]
    pub http_addr: String,

    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Maximum concurrent connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Per-request timeout in milliseconds, enforced by the host.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Keep-alive in seconds. `None` disables keep-alive.
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: Option<u64>,

    /// Largest accepted request body.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            max_connections: default_max_connections(),
            request_timeout_ms: default_request_timeout(),
            keep_alive_secs: default_keep_alive(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_http_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_max_connections() -> u32 {
    10_000
}

fn default_request_timeout() -> u64 {
    30_000
}

#[allow(clippy::unnecessary_wraps)]
fn default_keep_alive() -> Option<u64> {
    Some(60)
}

fn default_max_body_bytes() -> usize {
    2 * 1024 * 1024
}

/// Where CSRF tokens live.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CsrfConfig {
    /// Session key holding the expected token.
    #[serde(default = "default_csrf_session_key")]
    pub session_key: String,

    /// Form field carrying the submitted token.
    #[serde(default = "default_csrf_form_field")]
    pub form_field: String,

    /// Header carrying the submitted token.
    #[serde(default = "default_csrf_header")]
    pub header: String,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            session_key: default_csrf_session_key(),
            form_field: default_csrf_form_field(),
            header: default_csrf_header(),
        }
    }
}

fn default_csrf_session_key() -> String {
    "csrf_token".to_string()
}

fn default_csrf_form_field() -> String {
    "_csrf".to_string()
}

fn default_csrf_header() -> String {
    "x-csrf-token".to_string()
}

/// Session cookie settings for the in-memory store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Cookie name.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Idle lifetime in seconds.
    #[serde(default = "default_session_ttl")]
    pub ttl_secs: u64,

    /// Mark the cookie `Secure`.
    #[serde(default)]
    pub secure: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            ttl_secs: default_session_ttl(),
            secure: false,
        }
    }
}

fn default_cookie_name() -> String {
    "LODESTAR_SESSION".to_string()
}

fn default_session_ttl() -> u64 {
    1800
}

/// Access control and CSRF settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct SecurityConfig {
    /// CSRF token locations.
    #[serde(default)]
    pub csrf: CsrfConfig,

    /// Session cookie settings.
    #[serde(default)]
    pub sessions: SessionConfig,

    /// Redirect target for unauthenticated browser requests.
    #[serde(default)]
    pub login_path: Option<String>,
}

/// What clients are shown after a failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ErrorsConfig {
    /// Redirect target for browser clients after a server-side failure.
    #[serde(default = "default_error_route")]
    pub error_route: String,

    /// Flash message for server-side failures.
    #[serde(default = "default_generic_message")]
    pub generic_message: String,

    /// Flash message for CSRF failures.
    #[serde(default = "default_csrf_message")]
    pub csrf_message: String,

    /// Flash message for unauthenticated requests.
    #[serde(default = "default_unauthenticated_message")]
    pub unauthenticated_message: String,

    /// Flash message for requests lacking a role.
    #[serde(default = "default_forbidden_message")]
    pub forbidden_message: String,
}

impl Default for ErrorsConfig {
    fn default() -> Self {
        Self {
            error_route: default_error_route(),
            generic_message: default_generic_message(),
            csrf_message: default_csrf_message(),
            unauthenticated_message: default_unauthenticated_message(),
            forbidden_message: default_forbidden_message(),
        }
    }
}

fn default_error_route() -> String {
    "/error".to_string()
}

fn default_generic_message() -> String {
    "An error occurred. Please try again.".to_string()
}

fn default_csrf_message() -> String {
    "Invalid security token. Please try again.".to_string()
}

fn default_unauthenticated_message() -> String {
    "Please sign in to continue.".to_string()
}

fn default_forbidden_message() -> String {
    "You do not have permission to access this page.".to_string()
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON lines.
    #[default]
    Json,
    /// Human-readable output.
    Pretty,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Install a subscriber.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include source file and line.
    #[serde(default)]
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            include_location: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Prometheus exporter settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Install the exporter.
    #[serde(default)]
    pub enabled: bool,

    /// Scrape endpoint address.
    #[serde(default = "default_metrics_addr")]
    pub addr: String,

    /// Buckets for the dispatch duration histogram.
    #[serde(default = "default_histogram_buckets")]
    pub histogram_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: default_metrics_addr(),
            histogram_buckets: default_histogram_buckets(),
        }
    }
}

fn default_metrics_addr() -> String {
    "0.0.0.0:9090".to_string()
}

fn default_histogram_buckets() -> Vec<f64> {
    vec![
        0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ]
}

fn default_true() -> bool {
    true
}
