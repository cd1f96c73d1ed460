//! # Integration Tests
//!
//! Drive the aggregation service through its public API against the
//! in-memory registry, with real BLS keys.


mod concurrency;
mod scenarios;
mod telemetry;
