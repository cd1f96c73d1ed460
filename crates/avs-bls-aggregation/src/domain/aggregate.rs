//! Per-digest aggregates and the immutable per-task registry snapshot.

use super::bls;
use super::entities::{
    BlsSignature, G1PublicKey, G2PublicKey, OperatorAvsState, OperatorId, QuorumAvsState,
    QuorumNum,
};
use super::errors::BlsError;
use primitive_types::U256;
use std::collections::{HashMap, HashSet};

/// Everything accumulated for one response digest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AggregatedOperators {
    /// Sum of the signers' G2 keys
    pub signers_apk_g2: G2PublicKey,
    /// Sum of the signers' signatures
    pub signers_agg_sig_g1: BlsSignature,
    pub signers_operator_ids: HashSet<OperatorId>,
    pub signers_total_stake_per_quorum: HashMap<QuorumNum, U256>,
}

impl AggregatedOperators {
    /// Start an aggregate from its first signer.
    pub fn new(operator: &OperatorAvsState, pubkey: G2PublicKey, signature: BlsSignature) -> Self {
        Self {
            signers_apk_g2: pubkey,
            signers_agg_sig_g1: signature,
            signers_operator_ids: HashSet::from([operator.operator_id]),
            signers_total_stake_per_quorum: operator.stake_per_quorum.clone(),
        }
    }

    /// Fold another signer in.
    ///
    /// Both point additions are computed before anything is written, so an
    /// error leaves the aggregate unchanged.
    pub fn add_signer(
        &mut self,
        operator: &OperatorAvsState,
        pubkey: &G2PublicKey,
        signature: &BlsSignature,
    ) -> Result<(), BlsError> {
        let agg_sig = bls::add_signature(&self.signers_agg_sig_g1, signature)?;
        let apk = bls::add_g2_pubkey(&self.signers_apk_g2, pubkey)?;

        self.signers_agg_sig_g1 = agg_sig;
        self.signers_apk_g2 = apk;
        self.signers_operator_ids.insert(operator.operator_id);
        for (quorum, stake) in &operator.stake_per_quorum {
            let total = self
                .signers_total_stake_per_quorum
                .entry(*quorum)
                .or_insert_with(U256::zero);
            *total = total.saturating_add(*stake);
        }
        Ok(())
    }
}

/// Registry state for a task, fetched once when the worker starts.
#[derive(Clone, Debug)]
pub struct TaskSnapshot {
    pub operators: HashMap<OperatorId, OperatorAvsState>,
    pub total_stake_per_quorum: HashMap<QuorumNum, U256>,
    /// In the task's quorum order.
    pub quorum_apks_g1: Vec<G1PublicKey>,
}

impl TaskSnapshot {
    /// Combine operator and quorum state for the task's quorums.
    ///
    /// # Errors
    /// Returns the first task quorum the quorum state does not cover.
    pub fn new(
        quorum_numbers: &[QuorumNum],
        operators: HashMap<OperatorId, OperatorAvsState>,
        quorums: &HashMap<QuorumNum, QuorumAvsState>,
    ) -> Result<Self, QuorumNum> {
        let mut total_stake_per_quorum = HashMap::with_capacity(quorum_numbers.len());
        let mut quorum_apks_g1 = Vec::with_capacity(quorum_numbers.len());

        for quorum in quorum_numbers {
            let state = quorums.get(quorum).ok_or(*quorum)?;
            total_stake_per_quorum.insert(*quorum, state.total_stake);
            quorum_apks_g1.push(state.agg_pubkey_g1);
        }

        Ok(Self {
            operators,
            total_stake_per_quorum,
            quorum_apks_g1,
        })
    }

    pub fn operator(&self, operator_id: &OperatorId) -> Option<&OperatorAvsState> {
        self.operators.get(operator_id)
    }

    /// Snapshot operators that are not in `signers`, ascending by numeric id,
    /// paired with their G1 keys in the same order.
    pub fn non_signers(&self, signers: &HashSet<OperatorId>) -> (Vec<OperatorId>, Vec<G1PublicKey>) {
        let mut ids: Vec<OperatorId> = self
            .operators
            .keys()
            .filter(|id| !signers.contains(id))
            .copied()
            .collect();
        ids.sort_unstable();

        let pubkeys = ids
            .iter()
            .filter_map(|id| self.operators.get(id).map(|op| op.pubkeys.g1))
            .collect();

        (ids, pubkeys)
    }
}
