//! # AVS Aggregation Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── support.rs      # Harness around the service and in-memory registry
//!     ├── scenarios.rs    # End-to-end task lifecycles
//!     ├── concurrency.rs  # Many tasks and submitters at once
//!     └── telemetry.rs    # Metrics exposition after real tasks
//!
//! tests/benches/
//! └── aggregation_benchmarks.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p avs-tests
//!
//! # By category
//! cargo test -p avs-tests integration::scenarios::
//! cargo test -p avs-tests integration::concurrency::
//!
//! # Benchmarks
//! cargo bench -p avs-tests
//! ```

pub mod integration;
