//! Logging and metrics for Lodestar services.
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │            lodestar-telemetry              │
//! │                                            │
//! │   ┌──────────────┐     ┌──────────────┐    │
//! │   │   Logging    │     │   Metrics    │    │
//! │   │  (tracing)   │     │ (Prometheus) │    │
//! │   └──────┬───────┘     └──────┬───────┘    │
//! └──────────┼────────────────────┼────────────┘
//!            ▼                    ▼
//!      stdout (JSON or       /metrics scrape
//!      pretty lines)         endpoint
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use lodestar_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig {
//!     logging: LogConfig::development(),
//!     ..TelemetryConfig::default()
//! };
//! init_telemetry(&config)?;
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
pub mod logging;
pub mod metrics;

pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig};
pub use metrics::{init_metrics, DispatchTimer, MetricsConfig};

/// Result alias for telemetry setup.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Logging and metrics settings together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetryConfig {
    /// Logging settings.
    pub logging: LogConfig,
    /// Metrics settings.
    pub metrics: MetricsConfig,
}

/// Installs logging, then metrics.
///
/// # Errors
///
/// Returns the first subsystem failure.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryResult<()> {
    init_logging(&config.logging)?;
    init_metrics(&config.metrics)?;
    tracing::debug!(
        json = config.logging.json_format,
        metrics = config.metrics.enabled,
        "Telemetry initialized"
    );
    Ok(())
}
