//! Prometheus exposition.
//!
//! The aggregation crate registers its counters (`avs_aggregation_*`) with the
//! default registry when built with its `metrics` feature. This module renders
//! that registry for a scrape endpoint.

use prometheus::{Encoder, TextEncoder};

use crate::TelemetryError;

/// Encode every metric in the default registry as Prometheus text format.
pub fn gather_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
