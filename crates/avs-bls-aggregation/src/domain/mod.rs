//! # Domain Layer
//!
//! Pure aggregation logic with no I/O dependencies.
//! This is the inner layer of the hexagonal architecture.

pub mod aggregate;
pub mod bls;
pub mod entities;
pub mod errors;
pub mod task_state;
pub mod threshold;
