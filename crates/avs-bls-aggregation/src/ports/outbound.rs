//! # Outbound Ports (Driven Ports / SPI)
//!
//! Dependencies the aggregation service needs: registry state at a block,
//! response hashing, and the BLS verification primitive.

use crate::domain::entities::{
    BlockNumber, BlsSignature, CheckSignaturesIndices, G2PublicKey, OperatorAvsState, OperatorId,
    QuorumAvsState, QuorumNum, TaskResponseDigest,
};
use crate::domain::errors::{BlsError, HashError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Debug;
use thiserror::Error;

/// Error from registry queries.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// Requested block is not available to the provider
    #[error("Block {block_number} is not available: {reason}")]
    BlockUnavailable {
        block_number: BlockNumber,
        reason: String,
    },

    /// Registry has no data for a requested quorum
    #[error("Unknown quorum {0}")]
    UnknownQuorum(QuorumNum),

    /// Communication error with the chain or indexer
    #[error("Communication error: {0}")]
    CommunicationError(String),
}

/// Registry state at a given block.
///
/// Implementations own retries and caching; the aggregator calls each method
/// at most once per task (snapshots at start, indices at finalize).
#[async_trait]
pub trait QuorumStateProvider: Send + Sync + 'static {
    /// Every operator registered in any of `quorum_numbers` at `block_number`.
    async fn get_operators_avs_state_at_block(
        &self,
        quorum_numbers: &[QuorumNum],
        block_number: BlockNumber,
    ) -> Result<HashMap<OperatorId, OperatorAvsState>, ProviderError>;

    /// Total stake and aggregate G1 key of each quorum at `block_number`.
    async fn get_quorums_avs_state_at_block(
        &self,
        quorum_numbers: &[QuorumNum],
        block_number: BlockNumber,
    ) -> Result<HashMap<QuorumNum, QuorumAvsState>, ProviderError>;

    /// Index hints for on-chain signature checking.
    ///
    /// `non_signer_operator_ids` arrive sorted ascending.
    async fn get_check_signatures_indices(
        &self,
        block_number: BlockNumber,
        quorum_numbers: &[QuorumNum],
        non_signer_operator_ids: &[OperatorId],
    ) -> Result<CheckSignaturesIndices, ProviderError>;
}

/// Maps a task response to the digest operators sign.
///
/// Supplied once at service construction; must be deterministic.
pub trait TaskResponseHasher: Send + Sync + 'static {
    /// The opaque response type operators attest to.
    type Response: Clone + Debug + Send + Sync + 'static;

    fn digest(&self, response: &Self::Response) -> Result<TaskResponseDigest, HashError>;
}

/// BLS verification primitive.
pub trait SignatureVerifier: Send + Sync + 'static {
    /// `Ok(true)` if `signature` is valid for `digest` under `public_key`,
    /// `Ok(false)` if it is well-formed but wrong.
    fn verify(
        &self,
        signature: &BlsSignature,
        public_key: &G2PublicKey,
        digest: &TaskResponseDigest,
    ) -> Result<bool, BlsError>;
}
