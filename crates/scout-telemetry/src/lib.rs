//! # Scout Telemetry
//!
//! Logging and metrics shared by every Proxy-Scout process.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use scout_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! init_telemetry(&config)?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `PS_SERVICE_NAME` | `proxy-scout` | Service name in logs |
//! | `PS_LOG_LEVEL` / `RUST_LOG` | `info` | Log filter |
//! | `PS_JSON_LOGS` | `false` (`true` in containers) | JSON log output |

mod config;
mod logging;
pub mod metrics;

pub use config::{TelemetryConfig, DEFAULT_SERVICE_NAME};
pub use logging::{env_filter, init_logging};
pub use metrics::{
    encode_metrics, register_metrics, CANDIDATES_PROBED, CANDIDATES_SKIPPED, DEDUP_STORE_ERRORS,
    PROBE_DURATION, PROTOCOL_PROBES, RECONCILER_CYCLES, RESULTS_PERSISTED,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Register metrics, then install the log subscriber.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    register_metrics()?;
    init_logging(config)
}
