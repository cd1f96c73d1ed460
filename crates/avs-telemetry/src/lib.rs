//! # AVS Telemetry
//!
//! Logging and metrics exposition for the BLS aggregation service.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use avs_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     init_telemetry(&TelemetryConfig::from_env()).expect("Failed to init telemetry");
//!
//!     // Serve `avs_telemetry::gather_metrics()` from the scrape endpoint.
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `AVS_SERVICE_NAME` | `avs-aggregator` | Service name in logs |
//! | `AVS_LOG_LEVEL` | `info` | Log level filter (`RUST_LOG` also accepted) |
//! | `AVS_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `AVS_JSON_LOGS` | `false` (`true` in containers) | JSON log lines |

mod config;
mod metrics;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use metrics::gather_metrics;
pub use tracing_setup::{init_test_tracing, init_tracing};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracerInit(String),

    #[error("Failed to encode Prometheus metrics: {0}")]
    MetricsInit(String),
}

/// Initialize logging for the process.
///
/// Metrics need no initialization: they register themselves on first use.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    init_tracing(config)
}
