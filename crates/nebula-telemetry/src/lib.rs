//! # Nebula Telemetry
//!
//! Logging and metrics for NebulaSwap.
//!
//! ## Components
//!
//! - **Logs**: `tracing-subscriber` registry with `EnvFilter`, pretty or JSON output
//! - **Metrics**: Prometheus counters and histograms for swap outcomes
//!
//! ## Usage
//!
//! ```rust,ignore
//! use nebula_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_telemetry(&TelemetryConfig::from_env())?;
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_SERVICE_NAME` | `nebula-swap` | Service name in log lines |
//! | `NEBULA_LOG_LEVEL` | `info` | Log filter (falls back to `RUST_LOG`) |
//! | `NEBULA_JSON_LOGS` | `false` | JSON output |
//! | `NEBULA_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `NEBULA_NETWORK` | `devnet` | Network label |

#![warn(missing_docs)]

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::{env_filter, init_logging};
pub use metrics::{
    encode_metrics, record_chain_call, record_swap_finished, register_metrics, CHAIN_CALLS,
    SWAPS_FAILED, SWAPS_FINISHED, SWAPS_STARTED, SWAP_DURATION,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// A global subscriber is already installed, or installation failed.
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// Metric registration or encoding failed.
    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Register metrics, then install logging.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    register_metrics()?;
    init_logging(config)
}

/// Convenience macro for recording a metric increment.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}
