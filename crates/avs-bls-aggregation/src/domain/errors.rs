//! # Aggregation Errors
//!
//! Error taxonomy for the aggregation service:
//! - [`SignatureVerificationError`]: one rejected submission, reported to its
//!   submitter only. The task carries on.
//! - [`BlsAggregationError`]: returned by the facade (routing, initialization)
//!   or delivered once on the response stream (terminal task failures).
//! - [`BlsError`] / [`HashError`]: raised at the crypto and hashing ports.

use super::entities::{OperatorId, QuorumNum, TaskIndex};
use thiserror::Error;

/// Failures of BLS decoding or point arithmetic.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BlsError {
    /// Signature bytes are not a valid G1 point
    #[error("Invalid signature encoding")]
    InvalidSignature,

    /// Public key bytes are not a valid point
    #[error("Invalid public key encoding")]
    InvalidPublicKey,

    /// Cannot aggregate an empty list
    #[error("Cannot aggregate empty input")]
    EmptyAggregation,

    /// blst reported an unexpected error code
    #[error("BLS operation failed: {0}")]
    Internal(String),
}

/// Failure to hash a task response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HashError {
    #[error("Failed to encode task response: {0}")]
    Encoding(String),

    #[error("Task response rejected by hasher: {0}")]
    Rejected(String),
}

/// Why a single signed response was refused.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignatureVerificationError {
    /// Operator was not registered in any task quorum at the task's block
    #[error("Operator {operator_id} is not part of the task quorums")]
    OperatorNotInQuorum { operator_id: OperatorId },

    /// The task response could not be hashed
    #[error("Failed to hash task response: {0}")]
    HashFunction(#[from] HashError),

    /// Snapshot has no G2 public key for the operator
    #[error("Operator {operator_id} has no G2 public key")]
    MissingOperatorPubkey { operator_id: OperatorId },

    /// Operator already signed this digest
    #[error("Operator {operator_id} already signed this response digest")]
    DuplicateSignature { operator_id: OperatorId },

    /// Operator already signed a different digest for the same task
    #[error("Operator {operator_id} already signed a different response for this task")]
    ConflictingSignature { operator_id: OperatorId },

    /// The verification primitive failed before producing a verdict
    #[error("Signature verification failed: {0}")]
    SignatureVerification(String),

    /// Verification completed and the signature does not match
    #[error("Incorrect signature from operator {operator_id}")]
    IncorrectSignature { operator_id: OperatorId },
}

impl SignatureVerificationError {
    /// Stable label for metrics and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::OperatorNotInQuorum { .. } => "operator_not_in_quorum",
            Self::HashFunction(_) => "hash_function",
            Self::MissingOperatorPubkey { .. } => "missing_operator_pubkey",
            Self::DuplicateSignature { .. } => "duplicate_signature",
            Self::ConflictingSignature { .. } => "conflicting_signature",
            Self::SignatureVerification(_) => "signature_verification",
            Self::IncorrectSignature { .. } => "incorrect_signature",
        }
    }
}

/// Task parameter sets the aggregator cannot evaluate.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskParameterError {
    #[error("task requires at least one quorum")]
    EmptyQuorums,

    #[error("{quorums} quorum numbers but {thresholds} threshold percentages")]
    LengthMismatch { quorums: usize, thresholds: usize },

    #[error("quorum {0} listed more than once")]
    DuplicateQuorum(QuorumNum),

    #[error("threshold percentage {0} exceeds 100")]
    ThresholdAbove100(u8),
}

/// Errors surfaced by the aggregation service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BlsAggregationError {
    /// A task with this index is still running
    #[error("Task {task_index} is already initialized")]
    AlreadyInitialized { task_index: TaskIndex },

    /// Quorum numbers and thresholds cannot be evaluated
    #[error("Invalid parameters for task {task_index}: {reason}")]
    InvalidTaskParameters {
        task_index: TaskIndex,
        #[source]
        reason: TaskParameterError,
    },

    /// Configured active-task limit reached
    #[error("Cannot start task {task_index}: {limit} tasks already active")]
    TooManyActiveTasks { task_index: TaskIndex, limit: usize },

    /// No Tokio runtime to spawn the task worker on
    #[error("Cannot start task {task_index}: no Tokio runtime available")]
    RuntimeUnavailable { task_index: TaskIndex },

    /// No running task with this index
    #[error("Task {task_index} not found")]
    TaskNotFound { task_index: TaskIndex },

    /// Caller cancelled before the worker answered
    #[error("Signature submission for task {task_index} was cancelled")]
    Cancelled { task_index: TaskIndex },

    /// The worker rejected the submitted signature
    #[error("Signature rejected for task {task_index}: {source}")]
    Signature {
        task_index: TaskIndex,
        #[source]
        source: SignatureVerificationError,
    },

    /// Operator snapshot could not be fetched
    #[error("Failed to fetch operator state for task {task_index}: {reason}")]
    OperatorsStateRetrieval { task_index: TaskIndex, reason: String },

    /// Quorum snapshot could not be fetched or is incomplete
    #[error("Failed to fetch quorum state for task {task_index}: {reason}")]
    QuorumsStateRetrieval { task_index: TaskIndex, reason: String },

    /// On-chain check-signature indices could not be fetched
    #[error("Failed to fetch check-signature indices for task {task_index}: {reason}")]
    IndicesRetrieval { task_index: TaskIndex, reason: String },

    /// Expired before stake thresholds were met
    #[error("Task {task_index} expired before reaching quorum")]
    TaskExpired { task_index: TaskIndex },
}

impl BlsAggregationError {
    /// Label used when a task ends with this error.
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::TaskExpired { .. } => "expired",
            Self::OperatorsStateRetrieval { .. } | Self::QuorumsStateRetrieval { .. } => {
                "state_retrieval_failed"
            }
            Self::IndicesRetrieval { .. } => "indices_retrieval_failed",
            _ => "rejected",
        }
    }
}

/// Result type for facade operations.
pub type AggregationResult<T> = Result<T, BlsAggregationError>;
