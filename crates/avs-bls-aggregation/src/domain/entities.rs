//! # Domain Entities
//!
//! Core data structures for task aggregation: identifiers, BLS key and
//! signature encodings, the per-block operator and quorum snapshots, and the
//! terminal aggregation result.

use super::errors::TaskParameterError;
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::Duration;

/// Opaque task identifier assigned by the caller.
pub type TaskIndex = u32;

/// Block number at which a task's operator set is snapshotted.
pub type BlockNumber = u32;

/// Hash of a task response; the message operators actually sign.
pub type TaskResponseDigest = [u8; 32];

// =============================================================================
// Identifiers
// =============================================================================

/// Quorum number as registered on-chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QuorumNum(pub u8);

impl fmt::Display for QuorumNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u8> for QuorumNum {
    fn from(n: u8) -> Self {
        Self(n)
    }
}

/// Operator identifier (32 bytes, big-endian).
///
/// The derived ordering compares bytes lexicographically, which for a
/// big-endian encoding is the same as comparing the numeric values. Non-signer
/// lists rely on this.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OperatorId(pub [u8; 32]);

impl OperatorId {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Numeric value of the identifier.
    pub fn to_u256(&self) -> U256 {
        U256::from_big_endian(&self.0)
    }
}

impl From<[u8; 32]> for OperatorId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl From<U256> for OperatorId {
    fn from(value: U256) -> Self {
        let mut bytes = [0u8; 32];
        value.to_big_endian(&mut bytes);
        Self(bytes)
    }
}

impl fmt::Display for OperatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for OperatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OperatorId({})", self)
    }
}

// =============================================================================
// BLS Types (BLS12-381, min-sig)
// =============================================================================

/// BLS signature (G1 point, compressed).
#[serde_as]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlsSignature {
    /// G1 point (48 bytes compressed)
    #[serde_as(as = "Bytes")]
    pub bytes: [u8; 48],
}

/// BLS public key on G1 (compressed). Used for quorum APKs and non-signers.
#[serde_as]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct G1PublicKey {
    /// G1 point (48 bytes compressed)
    #[serde_as(as = "Bytes")]
    pub bytes: [u8; 48],
}

/// BLS public key on G2 (compressed). Signatures are verified against it.
#[serde_as]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct G2PublicKey {
    /// G2 point (96 bytes compressed)
    #[serde_as(as = "Bytes")]
    pub bytes: [u8; 96],
}

/// Both public keys an operator registers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorPubkeys {
    pub g1: G1PublicKey,
    /// Absent only for malformed registry entries.
    pub g2: Option<G2PublicKey>,
}

// =============================================================================
// Snapshots
// =============================================================================

/// An operator's registration at a given block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorAvsState {
    pub operator_id: OperatorId,
    pub pubkeys: OperatorPubkeys,
    /// Stake the operator holds in each quorum it belongs to.
    pub stake_per_quorum: HashMap<QuorumNum, U256>,
    pub block_number: BlockNumber,
}

/// Totals for one quorum at a given block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuorumAvsState {
    pub quorum_number: QuorumNum,
    pub total_stake: U256,
    pub agg_pubkey_g1: G1PublicKey,
    pub block_number: BlockNumber,
}

/// Index hints the on-chain signature checker needs to locate historical
/// registry entries.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckSignaturesIndices {
    pub non_signer_quorum_bitmap_indices: Vec<u32>,
    pub quorum_apk_indices: Vec<u32>,
    pub total_stake_indices: Vec<u32>,
    /// Outer vector follows the task's quorum order.
    pub non_signer_stake_indices: Vec<Vec<u32>>,
}

// =============================================================================
// Task Metadata
// =============================================================================

/// Parameters a task is initialized with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskMetadata {
    pub task_index: TaskIndex,
    pub created_at_block: BlockNumber,
    pub quorum_numbers: Vec<QuorumNum>,
    /// Percentages (0-100), one per entry of `quorum_numbers`.
    pub quorum_threshold_percentages: Vec<u8>,
    pub time_to_expiry: Duration,
    /// Grace period after thresholds are first met. Zero finalizes immediately.
    pub window_duration: Duration,
}

impl TaskMetadata {
    pub fn new(
        task_index: TaskIndex,
        created_at_block: BlockNumber,
        quorum_numbers: Vec<QuorumNum>,
        quorum_threshold_percentages: Vec<u8>,
        time_to_expiry: Duration,
    ) -> Self {
        Self {
            task_index,
            created_at_block,
            quorum_numbers,
            quorum_threshold_percentages,
            time_to_expiry,
            window_duration: Duration::ZERO,
        }
    }

    pub fn with_window(mut self, window_duration: Duration) -> Self {
        self.window_duration = window_duration;
        self
    }

    /// Threshold percentage per quorum.
    ///
    /// Only meaningful after [`TaskMetadata::validate`] has passed.
    pub fn thresholds(&self) -> HashMap<QuorumNum, u8> {
        self.quorum_numbers
            .iter()
            .copied()
            .zip(self.quorum_threshold_percentages.iter().copied())
            .collect()
    }

    /// Reject parameter sets the aggregator cannot evaluate.
    pub fn validate(&self) -> Result<(), TaskParameterError> {
        if self.quorum_numbers.is_empty() {
            return Err(TaskParameterError::EmptyQuorums);
        }
        if self.quorum_numbers.len() != self.quorum_threshold_percentages.len() {
            return Err(TaskParameterError::LengthMismatch {
                quorums: self.quorum_numbers.len(),
                thresholds: self.quorum_threshold_percentages.len(),
            });
        }
        let mut seen = HashSet::new();
        for quorum in &self.quorum_numbers {
            if !seen.insert(*quorum) {
                return Err(TaskParameterError::DuplicateQuorum(*quorum));
            }
        }
        if let Some(pct) = self
            .quorum_threshold_percentages
            .iter()
            .find(|pct| **pct > 100)
        {
            return Err(TaskParameterError::ThresholdAbove100(*pct));
        }
        Ok(())
    }
}

// =============================================================================
// Aggregation Result
// =============================================================================

/// Successful outcome of a task: everything needed to submit the aggregate
/// signature for on-chain checking.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AggregatedTaskResponse<R> {
    pub task_index: TaskIndex,
    pub task_response: R,
    pub task_response_digest: TaskResponseDigest,
    /// Sorted ascending by numeric operator id.
    pub non_signer_operator_ids: Vec<OperatorId>,
    /// Same order as `non_signer_operator_ids`.
    pub non_signers_pubkeys_g1: Vec<G1PublicKey>,
    /// Same order as the task's quorum numbers.
    pub quorum_apks_g1: Vec<G1PublicKey>,
    pub signers_apk_g2: G2PublicKey,
    pub signers_agg_sig_g1: BlsSignature,
    pub signed_stake_per_quorum: HashMap<QuorumNum, U256>,
    pub total_stake_per_quorum: HashMap<QuorumNum, U256>,
    pub indices: CheckSignaturesIndices,
}
