//! # BLS Aggregation Service
//!
//! Collects BLS signatures from AVS operators over off-chain task responses,
//! aggregates them per response digest, and reports a task as complete once
//! enough stake in every required quorum has signed the same response.
//!
//! ## Architecture
//!
//! This crate follows hexagonal architecture:
//! - **Domain Layer** (`domain/`): BLS arithmetic, threshold math, per-task state
//! - **Ports Layer** (`ports/`): Trait definitions for inbound/outbound interfaces
//! - **Adapters** (`adapters/`): blst verifier, keccak hashers, in-memory registry
//! - **Service Layer** (`service.rs`): Facade that spawns and routes to task workers
//!
//! ```text
//! ┌──────────────────────┐   initialize / process_new_signature
//! │ BlsAggregationService│◄──────────────────────────────────────── caller
//! └─────────┬────────────┘
//!           │ mpsc (one inbox per task)          oneshot verdict
//!           ▼                                          ▲
//! ┌──────────────────────┐   QuorumStateProvider       │
//! │  TaskWorker (tokio)  │─────────────────────► registry snapshot
//! │  verify → merge →    │─────────────────────────────┘
//! │  threshold → window  │
//! └─────────┬────────────┘
//!           │ one response per task
//!           ▼
//!     response_channel()
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! let service = BlsAggregationService::new(config, provider, Keccak256TaskResponseHasher::new())?;
//! let mut responses = service.response_channel().expect("taken once");
//!
//! service.initialize_new_task(task_index, block, vec![QuorumNum(0)], vec![67], expiry)?;
//! service.process_new_signature(&cancel, task_index, response, signature, operator_id).await?;
//!
//! let aggregated = responses.next().await;
//! ```
//!
//! ## Security Notes
//!
//! - Signatures are checked against the G2 key registered at the task's block
//! - An operator contributes to at most one response digest per task
//! - Threshold comparisons are exact integer arithmetic, as on-chain

pub mod adapters;
pub mod config;
pub mod domain;
pub mod metrics;
pub mod ports;
pub mod service;
mod worker;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-export public API
pub use adapters::{
    BlstSignatureVerifier, InMemoryQuorumStateProvider, Keccak256TaskResponseHasher,
    TaskResponseHashFn,
};
pub use config::{BlsAggregatorConfig, ConfigError};
pub use domain::entities::{
    AggregatedTaskResponse, BlockNumber, BlsSignature, CheckSignaturesIndices, G1PublicKey,
    G2PublicKey, OperatorAvsState, OperatorId, OperatorPubkeys, QuorumAvsState, QuorumNum,
    TaskIndex, TaskMetadata, TaskResponseDigest,
};
pub use domain::errors::{
    AggregationResult, BlsAggregationError, BlsError, HashError, SignatureVerificationError,
    TaskParameterError,
};
pub use ports::inbound::{BlsAggregationApi, BlsAggregationServiceResponse, ResponseStream};
pub use ports::outbound::{ProviderError, QuorumStateProvider, SignatureVerifier, TaskResponseHasher};
pub use service::BlsAggregationService;
