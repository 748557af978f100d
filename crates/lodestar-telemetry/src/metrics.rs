//! Dispatch metrics.
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `lodestar_dispatch_total` | Counter | `route`, `status` |
//! | `lodestar_dispatch_duration_seconds` | Histogram | `route` |
//! | `lodestar_dispatch_failures_total` | Counter | `kind` |
//! | `lodestar_routes_loaded` | Gauge | - |
//!
//! Recording works whether or not an exporter is installed; without one the
//! `metrics` facade drops the values.

use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

use crate::error::TelemetryError;
use crate::TelemetryResult;

/// Total dispatched requests.
pub const DISPATCH_TOTAL: &str = "lodestar_dispatch_total";
/// Dispatch latency.
pub const DISPATCH_DURATION: &str = "lodestar_dispatch_duration_seconds";
/// Failures by pipeline stage.
pub const DISPATCH_FAILURES: &str = "lodestar_dispatch_failures_total";
/// Routes in the active routing table.
pub const ROUTES_LOADED: &str = "lodestar_routes_loaded";

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics exporter configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsConfig {
    /// Whether to install the Prometheus exporter.
    pub enabled: bool,

    /// Listen address of the scrape endpoint.
    pub addr: String,

    /// Buckets for the duration histogram.
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: "0.0.0.0:9090".to_string(),
            duration_buckets: vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ],
        }
    }
}

/// Installs the Prometheus exporter with its own scrape listener.
///
/// # Errors
///
/// Fails on an unparsable address or if a recorder is already installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let addr: SocketAddr = config
        .addr
        .parse()
        .map_err(|e| TelemetryError::InvalidAddress(format!("{}: {e}", config.addr)))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Full(DISPATCH_DURATION.to_string()),
            &config.duration_buckets,
        )
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?
        .install()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    describe_metrics();
    Ok(())
}

/// Installs a recorder without a listener and keeps its handle for
/// [`render_metrics`].
///
/// # Errors
///
/// Fails if a recorder is already installed.
pub fn install_recorder(config: &MetricsConfig) -> TelemetryResult<()> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(DISPATCH_DURATION.to_string()),
            &config.duration_buckets,
        )
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?
        .install_recorder()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    let _ = METRICS_HANDLE.set(handle);
    describe_metrics();
    Ok(())
}

/// Renders metrics in Prometheus text format, if [`install_recorder`] ran.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

fn describe_metrics() {
    describe_counter!(DISPATCH_TOTAL, "Requests dispatched, by route and status");
    describe_histogram!(DISPATCH_DURATION, "Dispatch pipeline duration in seconds");
    describe_counter!(DISPATCH_FAILURES, "Dispatch failures, by pipeline stage");
    describe_gauge!(ROUTES_LOADED, "Routes in the active routing table");
}

/// Records one finished dispatch.
///
/// `route` is the route name, or the pattern for unnamed routes.
pub fn record_dispatch(route: &str, status: u16, duration: Duration) {
    counter!(
        DISPATCH_TOTAL,
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(DISPATCH_DURATION, "route" => route.to_string()).record(duration.as_secs_f64());
}

/// Counts a failed dispatch by pipeline stage.
pub fn record_failure(kind: &str) {
    counter!(DISPATCH_FAILURES, "kind" => kind.to_string()).increment(1);
}

/// Sets the number of routes in the active table.
#[allow(clippy::cast_precision_loss)]
pub fn record_routes_loaded(count: usize) {
    gauge!(ROUTES_LOADED).set(count as f64);
}

/// Measures one dispatch.
#[derive(Debug)]
pub struct DispatchTimer {
    started: Instant,
}

impl DispatchTimer {
    /// Starts the clock.
    #[must_use]
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    /// Time since [`start`](Self::start).
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Records the dispatch and returns its duration.
    pub fn finish(self, route: &str, status: u16) -> Duration {
        let elapsed = self.elapsed();
        record_dispatch(route, status, elapsed);
        elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MetricsConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.addr, "0.0.0.0:9090");
        assert_eq!(config.duration_buckets.len(), 12);
    }

    #[test]
    fn test_disabled_init_is_noop() {
        assert!(init_metrics(&MetricsConfig::default()).is_ok());
    }

    #[test]
    fn test_invalid_address() {
        let config = MetricsConfig {
            enabled: true,
            addr: "not-an-address".to_string(),
            ..MetricsConfig::default()
        };
        assert!(matches!(
            init_metrics(&config),
            Err(TelemetryError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_recording_without_exporter() {
        record_dispatch("dashboard", 200, Duration::from_millis(3));
        record_failure("csrf");
        record_routes_loaded(4);
        let timer = DispatchTimer::start();
        let elapsed = timer.finish("dashboard", 302);
        assert!(elapsed < Duration::from_secs(5));
    }
}
