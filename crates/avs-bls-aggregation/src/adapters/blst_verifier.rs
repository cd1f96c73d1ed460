//! blst-backed implementation of the [`SignatureVerifier`] port.

use crate::domain::bls;
use crate::domain::entities::{BlsSignature, G2PublicKey, TaskResponseDigest};
use crate::domain::errors::BlsError;
use crate::ports::outbound::SignatureVerifier;

/// Verifies G1 signatures against G2 keys on BLS12-381.
#[derive(Clone, Copy, Debug, Default)]
pub struct BlstSignatureVerifier;

impl SignatureVerifier for BlstSignatureVerifier {
    fn verify(
        &self,
        signature: &BlsSignature,
        public_key: &G2PublicKey,
        digest: &TaskResponseDigest,
    ) -> Result<bool, BlsError> {
        bls::verify_signature(digest, signature, public_key)
    }
}
