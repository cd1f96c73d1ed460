//! Centralized Testing Utilities
//!
//! Deterministic BLS operators and registry fixtures. Available to this crate's
//! unit tests and, with the `test-utils` feature, to downstream test suites.
//!
//! # Example
//!
//! ```rust,ignore
//! use avs_bls_aggregation::testing::{provider_with, TestOperator};
//!
//! let operators = vec![
//!     TestOperator::new(1, &[(0, 100)]),
//!     TestOperator::new(2, &[(0, 50)]),
//! ];
//! let provider = provider_with(&operators, 0);
//! assert_eq!(provider.operator_count(), 2);
//! ```

use crate::adapters::{keccak256, InMemoryQuorumStateProvider};
use crate::domain::aggregate::TaskSnapshot;
use crate::domain::bls::DST;
use crate::domain::entities::{
    BlockNumber, BlsSignature, G1PublicKey, G2PublicKey, OperatorAvsState, OperatorId,
    OperatorPubkeys, QuorumNum, TaskResponseDigest,
};
use primitive_types::U256;
use std::collections::HashMap;
use std::fmt;

/// BLS key pair derived from a numeric seed.
///
/// The same seed always yields the same keys, so fixtures are reproducible.
#[derive(Clone)]
pub struct BlsKeyPair {
    secret: blst::min_sig::SecretKey,
}

impl fmt::Debug for BlsKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlsKeyPair").field("g2", &self.g2()).finish()
    }
}

impl BlsKeyPair {
    pub fn from_seed(seed: u64) -> Self {
        let mut material = b"avs-bls-test-key".to_vec();
        material.extend_from_slice(&seed.to_be_bytes());
        let ikm = keccak256(&material);

        let secret = blst::min_sig::SecretKey::key_gen(&ikm, &[])
            .expect("32 bytes of key material is always enough");
        Self { secret }
    }

    /// Sign a response digest (G1 signature).
    pub fn sign(&self, digest: &TaskResponseDigest) -> BlsSignature {
        BlsSignature {
            bytes: self.secret.sign(digest, DST, &[]).to_bytes(),
        }
    }

    /// Verification key on G2.
    pub fn g2(&self) -> G2PublicKey {
        G2PublicKey {
            bytes: self.secret.sk_to_pk().to_bytes(),
        }
    }

    /// The same scalar's public key on G1.
    pub fn g1(&self) -> G1PublicKey {
        let secret = blst::min_pk::SecretKey::from_bytes(&self.secret.to_bytes())
            .expect("scalar round-trips between blst variants");
        G1PublicKey {
            bytes: secret.sk_to_pk().to_bytes(),
        }
    }
}

/// A registered operator with deterministic keys and fixed stake.
#[derive(Clone, Debug)]
pub struct TestOperator {
    pub id: OperatorId,
    pub keys: BlsKeyPair,
    pub stake_per_quorum: HashMap<QuorumNum, U256>,
    g2_registered: bool,
}

impl TestOperator {
    /// Operator whose numeric id and key seed are both `id`.
    pub fn new(id: u64, stakes: &[(u8, u64)]) -> Self {
        Self {
            id: OperatorId::from(U256::from(id)),
            keys: BlsKeyPair::from_seed(id),
            stake_per_quorum: stakes
                .iter()
                .map(|(quorum, stake)| (QuorumNum(*quorum), U256::from(*stake)))
                .collect(),
            g2_registered: true,
        }
    }

    /// Registry entry without a G2 key.
    pub fn without_g2(mut self) -> Self {
        self.g2_registered = false;
        self
    }

    pub fn pubkeys(&self) -> OperatorPubkeys {
        OperatorPubkeys {
            g1: self.g1(),
            g2: self.g2_registered.then(|| self.g2()),
        }
    }

    pub fn avs_state(&self, block_number: BlockNumber) -> OperatorAvsState {
        OperatorAvsState {
            operator_id: self.id,
            pubkeys: self.pubkeys(),
            stake_per_quorum: self.stake_per_quorum.clone(),
            block_number,
        }
    }

    pub fn g1(&self) -> G1PublicKey {
        self.keys.g1()
    }

    pub fn g2(&self) -> G2PublicKey {
        self.keys.g2()
    }

    pub fn sign(&self, digest: &TaskResponseDigest) -> BlsSignature {
        self.keys.sign(digest)
    }

    pub fn register(&self, provider: &InMemoryQuorumStateProvider, registered_at: BlockNumber) {
        provider.register_operator(
            self.id,
            self.pubkeys(),
            self.stake_per_quorum.clone(),
            registered_at,
        );
    }
}

/// Provider with every operator registered from `registered_at`.
pub fn provider_with(
    operators: &[TestOperator],
    registered_at: BlockNumber,
) -> InMemoryQuorumStateProvider {
    let provider = InMemoryQuorumStateProvider::new();
    for operator in operators {
        operator.register(&provider, registered_at);
    }
    provider
}

/// Task snapshot for `operators` at `block_number`.
///
/// # Panics
/// If some quorum in `quorum_numbers` has no member among `operators`.
pub fn snapshot_for(
    quorum_numbers: &[QuorumNum],
    operators: &[TestOperator],
    block_number: BlockNumber,
) -> TaskSnapshot {
    let provider = provider_with(operators, 0);
    let quorums = provider
        .quorums_at(quorum_numbers, block_number)
        .expect("every fixture quorum has members");
    TaskSnapshot::new(
        quorum_numbers,
        provider.operators_at(quorum_numbers, block_number),
        &quorums,
    )
    .expect("quorum state covers every fixture quorum")
}
