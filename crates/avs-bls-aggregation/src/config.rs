//! Aggregator configuration with validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default capacity of each task's signature inbox.
pub const DEFAULT_SIGNATURE_CHANNEL_CAPACITY: usize = 1024;

/// Default upper bound on concurrently running tasks.
pub const DEFAULT_MAX_ACTIVE_TASKS: usize = 10_000;

/// Aggregation service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlsAggregatorConfig {
    /// Signatures buffered per task before submitters wait for the worker
    pub signature_channel_capacity: usize,
    /// Tasks that may run at once; further initializations are refused
    pub max_active_tasks: usize,
}

impl Default for BlsAggregatorConfig {
    fn default() -> Self {
        Self {
            signature_channel_capacity: DEFAULT_SIGNATURE_CHANNEL_CAPACITY,
            max_active_tasks: DEFAULT_MAX_ACTIVE_TASKS,
        }
    }
}

impl BlsAggregatorConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.signature_channel_capacity == 0 {
            return Err(ConfigError::InvalidLimit(
                "signature_channel_capacity cannot be 0".into(),
            ));
        }

        if self.max_active_tasks == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_active_tasks cannot be 0".into(),
            ));
        }

        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid limit: {0}")]
    InvalidLimit(String),
}
