//! # Aggregation Metrics
//!
//! Prometheus metrics for task and signature throughput.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! avs-bls-aggregation = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `avs_aggregation_tasks_initialized_total` - Counter of started tasks
//! - `avs_aggregation_tasks_completed_total` - Counter of finished tasks (by outcome)
//! - `avs_aggregation_signatures_accepted_total` - Counter of merged signatures
//! - `avs_aggregation_signatures_rejected_total` - Counter of rejected signatures (by reason)
//! - `avs_aggregation_active_tasks` - Gauge of running task workers

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, IntCounter,
    IntCounterVec, IntGauge,
};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Total tasks initialized
    pub static ref TASKS_INITIALIZED: IntCounter = register_int_counter!(
        "avs_aggregation_tasks_initialized_total",
        "Total number of aggregation tasks initialized"
    )
    .expect("Failed to create TASKS_INITIALIZED metric");

    /// Total tasks finished, labeled by outcome
    pub static ref TASKS_COMPLETED: IntCounterVec = register_int_counter_vec!(
        "avs_aggregation_tasks_completed_total",
        "Total number of aggregation tasks finished",
        &["outcome"]
    )
    .expect("Failed to create TASKS_COMPLETED metric");

    /// Total signatures merged into an aggregate
    pub static ref SIGNATURES_ACCEPTED: IntCounter = register_int_counter!(
        "avs_aggregation_signatures_accepted_total",
        "Total number of operator signatures accepted"
    )
    .expect("Failed to create SIGNATURES_ACCEPTED metric");

    /// Total signatures rejected, labeled by reason
    pub static ref SIGNATURES_REJECTED: IntCounterVec = register_int_counter_vec!(
        "avs_aggregation_signatures_rejected_total",
        "Total number of operator signatures rejected",
        &["reason"]
    )
    .expect("Failed to create SIGNATURES_REJECTED metric");

    /// Running task workers
    pub static ref ACTIVE_TASKS: IntGauge = register_int_gauge!(
        "avs_aggregation_active_tasks",
        "Number of aggregation tasks currently running"
    )
    .expect("Failed to create ACTIVE_TASKS metric");
}

// =============================================================================
// METRIC RECORDING FUNCTIONS
// =============================================================================

/// Record a task worker starting
#[cfg(feature = "metrics")]
pub fn record_task_initialized() {
    TASKS_INITIALIZED.inc();
    ACTIVE_TASKS.inc();
}

/// Record a task worker finishing with `outcome`
#[cfg(feature = "metrics")]
pub fn record_task_completed(outcome: &str) {
    TASKS_COMPLETED.with_label_values(&[outcome]).inc();
    ACTIVE_TASKS.dec();
}

/// Record an accepted signature
#[cfg(feature = "metrics")]
pub fn record_signature_accepted() {
    SIGNATURES_ACCEPTED.inc();
}

/// Record a rejected signature with reason
#[cfg(feature = "metrics")]
pub fn record_signature_rejected(reason: &str) {
    SIGNATURES_REJECTED.with_label_values(&[reason]).inc();
}

// =============================================================================
// NO-OP IMPLEMENTATIONS (when metrics feature disabled)
// =============================================================================

#[cfg(not(feature = "metrics"))]
pub fn record_task_initialized() {}

#[cfg(not(feature = "metrics"))]
pub fn record_task_completed(_outcome: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_signature_accepted() {}

#[cfg(not(feature = "metrics"))]
pub fn record_signature_rejected(_reason: &str) {}
