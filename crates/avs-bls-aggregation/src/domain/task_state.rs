//! # Task State
//!
//! All mutable state of one task: the per-digest aggregates, which digest each
//! operator signed, and the current winning digest. Owned by a single worker.

use super::aggregate::{AggregatedOperators, TaskSnapshot};
use super::entities::{
    AggregatedTaskResponse, BlsSignature, CheckSignaturesIndices, G1PublicKey, OperatorId,
    QuorumNum, TaskMetadata, TaskResponseDigest,
};
use super::errors::SignatureVerificationError;
use super::threshold::check_stake_thresholds;
use crate::ports::outbound::{SignatureVerifier, TaskResponseHasher};
use primitive_types::U256;
use std::collections::HashMap;

/// Outcome of an accepted signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Accepted {
    pub digest: TaskResponseDigest,
    /// Whether the digest's aggregate meets every quorum threshold after the merge.
    pub thresholds_met: bool,
}

pub struct TaskState<R> {
    metadata: TaskMetadata,
    thresholds: HashMap<QuorumNum, u8>,
    snapshot: TaskSnapshot,
    aggregates: HashMap<TaskResponseDigest, AggregatedOperators>,
    signed_digests: HashMap<OperatorId, TaskResponseDigest>,
    /// Last digest touched while at or above threshold, with the response it was signed over.
    winner: Option<(TaskResponseDigest, R)>,
}

impl<R: Clone> TaskState<R> {
    pub fn new(metadata: TaskMetadata, snapshot: TaskSnapshot) -> Self {
        let thresholds = metadata.thresholds();
        Self {
            metadata,
            thresholds,
            snapshot,
            aggregates: HashMap::new(),
            signed_digests: HashMap::new(),
            winner: None,
        }
    }

    /// Verify a signed response and merge it into its digest's aggregate.
    ///
    /// On error nothing is modified.
    pub fn process_signature<H, V>(
        &mut self,
        hasher: &H,
        verifier: &V,
        operator_id: OperatorId,
        task_response: R,
        signature: BlsSignature,
    ) -> Result<Accepted, SignatureVerificationError>
    where
        H: TaskResponseHasher<Response = R>,
        V: SignatureVerifier,
    {
        let operator = self
            .snapshot
            .operator(&operator_id)
            .ok_or(SignatureVerificationError::OperatorNotInQuorum { operator_id })?;

        let digest = hasher.digest(&task_response)?;

        if let Some(previous) = self.signed_digests.get(&operator_id) {
            return Err(if *previous == digest {
                SignatureVerificationError::DuplicateSignature { operator_id }
            } else {
                SignatureVerificationError::ConflictingSignature { operator_id }
            });
        }

        let pubkey = operator
            .pubkeys
            .g2
            .ok_or(SignatureVerificationError::MissingOperatorPubkey { operator_id })?;

        match verifier.verify(&signature, &pubkey, &digest) {
            Ok(true) => {}
            Ok(false) => {
                return Err(SignatureVerificationError::IncorrectSignature { operator_id })
            }
            Err(e) => return Err(SignatureVerificationError::SignatureVerification(e.to_string())),
        }

        match self.aggregates.get_mut(&digest) {
            Some(aggregate) => aggregate
                .add_signer(operator, &pubkey, &signature)
                .map_err(|e| SignatureVerificationError::SignatureVerification(e.to_string()))?,
            None => {
                self.aggregates.insert(
                    digest,
                    AggregatedOperators::new(operator, pubkey, signature),
                );
            }
        }
        self.signed_digests.insert(operator_id, digest);

        let thresholds_met = self.aggregates.get(&digest).is_some_and(|aggregate| {
            check_stake_thresholds(
                &aggregate.signers_total_stake_per_quorum,
                &self.snapshot.total_stake_per_quorum,
                &self.thresholds,
            )
        });
        if thresholds_met {
            self.winner = Some((digest, task_response));
        }

        Ok(Accepted {
            digest,
            thresholds_met,
        })
    }

    pub fn has_winner(&self) -> bool {
        self.winner.is_some()
    }

    pub fn winning_digest(&self) -> Option<TaskResponseDigest> {
        self.winner.as_ref().map(|(digest, _)| *digest)
    }

    /// Non-signers of the winning digest with their G1 keys.
    pub fn winning_non_signers(&self) -> Option<(Vec<OperatorId>, Vec<G1PublicKey>)> {
        let digest = self.winning_digest()?;
        let aggregate = self.aggregates.get(&digest)?;
        Some(self.snapshot.non_signers(&aggregate.signers_operator_ids))
    }

    /// Aggregate for `digest`, if any operator signed it.
    pub fn aggregate(&self, digest: &TaskResponseDigest) -> Option<&AggregatedOperators> {
        self.aggregates.get(digest)
    }

    /// Assemble the terminal response for the winning digest.
    pub fn build_response(
        &self,
        indices: CheckSignaturesIndices,
    ) -> Option<AggregatedTaskResponse<R>> {
        let (digest, task_response) = self.winner.as_ref()?;
        let aggregate = self.aggregates.get(digest)?;
        let (non_signer_operator_ids, non_signers_pubkeys_g1) =
            self.snapshot.non_signers(&aggregate.signers_operator_ids);

        let signed_stake_per_quorum = self
            .metadata
            .quorum_numbers
            .iter()
            .map(|quorum| {
                let stake = aggregate
                    .signers_total_stake_per_quorum
                    .get(quorum)
                    .copied()
                    .unwrap_or_else(U256::zero);
                (*quorum, stake)
            })
            .collect();

        Some(AggregatedTaskResponse {
            task_index: self.metadata.task_index,
            task_response: task_response.clone(),
            task_response_digest: *digest,
            non_signer_operator_ids,
            non_signers_pubkeys_g1,
            quorum_apks_g1: self.snapshot.quorum_apks_g1.clone(),
            signers_apk_g2: aggregate.signers_apk_g2,
            signers_agg_sig_g1: aggregate.signers_agg_sig_g1,
            signed_stake_per_quorum,
            total_stake_per_quorum: self.snapshot.total_stake_per_quorum.clone(),
            indices,
        })
    }
}
