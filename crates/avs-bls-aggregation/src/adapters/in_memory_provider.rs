//! In-memory registry adapter.
//!
//! Implements [`QuorumStateProvider`] over a local operator registry with
//! block-ranged registrations. Used by tests and local development.

use crate::domain::bls;
use crate::domain::entities::{
    BlockNumber, CheckSignaturesIndices, G1PublicKey, OperatorAvsState, OperatorId,
    OperatorPubkeys, QuorumAvsState, QuorumNum,
};
use crate::ports::outbound::{ProviderError, QuorumStateProvider};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use primitive_types::U256;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// One operator registration.
#[derive(Clone, Debug)]
struct Registration {
    pubkeys: OperatorPubkeys,
    stake_per_quorum: HashMap<QuorumNum, U256>,
    registered_at: BlockNumber,
    /// First block at which the operator is no longer registered.
    deregistered_at: Option<BlockNumber>,
}

impl Registration {
    fn active_at(&self, block_number: BlockNumber) -> bool {
        self.registered_at <= block_number
            && self.deregistered_at.map_or(true, |end| block_number < end)
    }
}

#[derive(Clone, Debug, Default)]
struct InjectedFailures {
    operators: Option<ProviderError>,
    quorums: Option<ProviderError>,
    indices: Option<ProviderError>,
}

/// Registry held in memory.
///
/// Every registry entry has a single history slot, so all check-signature
/// indices are zero.
#[derive(Debug, Default)]
pub struct InMemoryQuorumStateProvider {
    operators: RwLock<HashMap<OperatorId, Registration>>,
    failures: RwLock<InjectedFailures>,
    latency: RwLock<Duration>,
    /// Non-signer lists passed to `get_check_signatures_indices`.
    indices_requests: Mutex<Vec<Vec<OperatorId>>>,
}

impl InMemoryQuorumStateProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or re-register) an operator from `registered_at` onwards.
    pub fn register_operator(
        &self,
        operator_id: OperatorId,
        pubkeys: OperatorPubkeys,
        stake_per_quorum: HashMap<QuorumNum, U256>,
        registered_at: BlockNumber,
    ) {
        self.operators.write().insert(
            operator_id,
            Registration {
                pubkeys,
                stake_per_quorum,
                registered_at,
                deregistered_at: None,
            },
        );
    }

    /// Deregister an operator as of `block_number`. Earlier blocks still see it.
    pub fn deregister_operator(&self, operator_id: &OperatorId, block_number: BlockNumber) {
        if let Some(registration) = self.operators.write().get_mut(operator_id) {
            registration.deregistered_at = Some(block_number);
        }
    }

    pub fn operator_count(&self) -> usize {
        self.operators.read().len()
    }

    /// Delay every query by `latency` (tokio time, so paused clocks apply).
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.write() = latency;
    }

    pub fn fail_operators_state(&self, error: ProviderError) {
        self.failures.write().operators = Some(error);
    }

    pub fn fail_quorums_state(&self, error: ProviderError) {
        self.failures.write().quorums = Some(error);
    }

    pub fn fail_check_signatures_indices(&self, error: ProviderError) {
        self.failures.write().indices = Some(error);
    }

    pub fn clear_failures(&self) {
        *self.failures.write() = InjectedFailures::default();
    }

    /// Non-signer lists received so far, in call order.
    pub fn indices_requests(&self) -> Vec<Vec<OperatorId>> {
        self.indices_requests.lock().clone()
    }

    /// Operators registered in any of `quorum_numbers` at `block_number`, with
    /// stake restricted to those quorums.
    pub fn operators_at(
        &self,
        quorum_numbers: &[QuorumNum],
        block_number: BlockNumber,
    ) -> HashMap<OperatorId, OperatorAvsState> {
        self.operators
            .read()
            .iter()
            .filter(|(_, registration)| registration.active_at(block_number))
            .filter_map(|(operator_id, registration)| {
                let stake_per_quorum: HashMap<QuorumNum, U256> = registration
                    .stake_per_quorum
                    .iter()
                    .filter(|(quorum, _)| quorum_numbers.contains(*quorum))
                    .map(|(quorum, stake)| (*quorum, *stake))
                    .collect();
                if stake_per_quorum.is_empty() {
                    return None;
                }
                Some((
                    *operator_id,
                    OperatorAvsState {
                        operator_id: *operator_id,
                        pubkeys: registration.pubkeys.clone(),
                        stake_per_quorum,
                        block_number,
                    },
                ))
            })
            .collect()
    }

    /// Total stake and G1 aggregate key of each quorum at `block_number`.
    ///
    /// # Errors
    /// * `UnknownQuorum` - the quorum has no members at that block
    /// * `CommunicationError` - a registered G1 key does not decode
    pub fn quorums_at(
        &self,
        quorum_numbers: &[QuorumNum],
        block_number: BlockNumber,
    ) -> Result<HashMap<QuorumNum, QuorumAvsState>, ProviderError> {
        let operators = self.operators.read();
        let mut quorums = HashMap::with_capacity(quorum_numbers.len());

        for quorum in quorum_numbers {
            let mut total_stake = U256::zero();
            let mut members: Vec<G1PublicKey> = Vec::new();
            for registration in operators.values() {
                if !registration.active_at(block_number) {
                    continue;
                }
                if let Some(stake) = registration.stake_per_quorum.get(quorum) {
                    total_stake = total_stake.saturating_add(*stake);
                    members.push(registration.pubkeys.g1);
                }
            }
            if members.is_empty() {
                return Err(ProviderError::UnknownQuorum(*quorum));
            }

            let agg_pubkey_g1 = bls::aggregate_g1_pubkeys(&members)
                .map_err(|e| ProviderError::CommunicationError(e.to_string()))?;
            quorums.insert(
                *quorum,
                QuorumAvsState {
                    quorum_number: *quorum,
                    total_stake,
                    agg_pubkey_g1,
                    block_number,
                },
            );
        }

        Ok(quorums)
    }

    async fn simulate_latency(&self) {
        let latency = *self.latency.read();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl QuorumStateProvider for InMemoryQuorumStateProvider {
    async fn get_operators_avs_state_at_block(
        &self,
        quorum_numbers: &[QuorumNum],
        block_number: BlockNumber,
    ) -> Result<HashMap<OperatorId, OperatorAvsState>, ProviderError> {
        self.simulate_latency().await;
        if let Some(error) = self.failures.read().operators.clone() {
            return Err(error);
        }
        let operators = self.operators_at(quorum_numbers, block_number);
        debug!(
            block_number,
            operators = operators.len(),
            "Served operator state"
        );
        Ok(operators)
    }

    async fn get_quorums_avs_state_at_block(
        &self,
        quorum_numbers: &[QuorumNum],
        block_number: BlockNumber,
    ) -> Result<HashMap<QuorumNum, QuorumAvsState>, ProviderError> {
        self.simulate_latency().await;
        if let Some(error) = self.failures.read().quorums.clone() {
            return Err(error);
        }
        self.quorums_at(quorum_numbers, block_number)
    }

    async fn get_check_signatures_indices(
        &self,
        block_number: BlockNumber,
        quorum_numbers: &[QuorumNum],
        non_signer_operator_ids: &[OperatorId],
    ) -> Result<CheckSignaturesIndices, ProviderError> {
        self.simulate_latency().await;
        self.indices_requests
            .lock()
            .push(non_signer_operator_ids.to_vec());
        if let Some(error) = self.failures.read().indices.clone() {
            return Err(error);
        }

        let operators = self.operators.read();
        let non_signer_stake_indices = quorum_numbers
            .iter()
            .map(|quorum| {
                let members = non_signer_operator_ids
                    .iter()
                    .filter(|id| {
                        operators.get(*id).is_some_and(|registration| {
                            registration.active_at(block_number)
                                && registration.stake_per_quorum.contains_key(quorum)
                        })
                    })
                    .count();
                vec![0; members]
            })
            .collect();

        Ok(CheckSignaturesIndices {
            non_signer_quorum_bitmap_indices: vec![0; non_signer_operator_ids.len()],
            quorum_apk_indices: vec![0; quorum_numbers.len()],
            total_stake_indices: vec![0; quorum_numbers.len()],
            non_signer_stake_indices,
        })
    }
}
