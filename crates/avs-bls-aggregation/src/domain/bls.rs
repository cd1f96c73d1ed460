//! # BLS Arithmetic (BLS12-381)
//!
//! Pure domain logic for verifying operator signatures and accumulating
//! aggregates.
//!
//! ## Implementation Details
//!
//! - Signatures are on G1 (48 bytes compressed)
//! - Signing keys used for verification are on G2 (96 bytes compressed)
//! - Quorum APKs and non-signer keys are reported on G1
//!
//! This uses blst's `min_sig` variant for signatures and G2 keys, and
//! `min_pk` for G1 public keys.

use super::entities::{BlsSignature, G1PublicKey, G2PublicKey, TaskResponseDigest};
use super::errors::BlsError;
use blst::min_sig::{AggregatePublicKey, AggregateSignature, PublicKey, Signature};
use blst::BLST_ERROR;

/// Domain Separation Tag for task response signatures
pub const DST: &[u8] = b"BLS_SIG_BLS12381G1_XMD:SHA-256_SSWU_RO_POP_";

fn parse_signature(signature: &BlsSignature) -> Result<Signature, BlsError> {
    Signature::from_bytes(&signature.bytes).map_err(|_| BlsError::InvalidSignature)
}

fn parse_g2_pubkey(public_key: &G2PublicKey) -> Result<PublicKey, BlsError> {
    PublicKey::from_bytes(&public_key.bytes).map_err(|_| BlsError::InvalidPublicKey)
}

/// Verify one signature over a response digest.
///
/// Returns `Ok(false)` when the pairing check runs and fails, and an error
/// when the inputs cannot be decoded or blst rejects them outright.
pub fn verify_signature(
    digest: &TaskResponseDigest,
    signature: &BlsSignature,
    public_key: &G2PublicKey,
) -> Result<bool, BlsError> {
    let sig = parse_signature(signature)?;
    let pk = parse_g2_pubkey(public_key)?;

    match sig.verify(true, digest, DST, &[], &pk, true) {
        BLST_ERROR::BLST_SUCCESS => Ok(true),
        BLST_ERROR::BLST_VERIFY_FAIL => Ok(false),
        other => Err(BlsError::Internal(format!("{:?}", other))),
    }
}

/// Add `signature` to an existing aggregate signature.
pub fn add_signature(
    aggregate: &BlsSignature,
    signature: &BlsSignature,
) -> Result<BlsSignature, BlsError> {
    let mut acc = AggregateSignature::from_signature(&parse_signature(aggregate)?);
    acc.add_signature(&parse_signature(signature)?, true)
        .map_err(|e| BlsError::Internal(format!("{:?}", e)))?;

    Ok(BlsSignature {
        bytes: acc.to_signature().to_bytes(),
    })
}

/// Add `public_key` to an existing aggregate G2 public key.
pub fn add_g2_pubkey(
    aggregate: &G2PublicKey,
    public_key: &G2PublicKey,
) -> Result<G2PublicKey, BlsError> {
    let mut acc = AggregatePublicKey::from_public_key(&parse_g2_pubkey(aggregate)?);
    acc.add_public_key(&parse_g2_pubkey(public_key)?, true)
        .map_err(|e| BlsError::Internal(format!("{:?}", e)))?;

    Ok(G2PublicKey {
        bytes: acc.to_public_key().to_bytes(),
    })
}

/// Aggregate multiple signatures into one.
///
/// # Errors
/// * `EmptyAggregation` if the input list is empty
pub fn aggregate_signatures(signatures: &[BlsSignature]) -> Result<BlsSignature, BlsError> {
    let (first, rest) = signatures.split_first().ok_or(BlsError::EmptyAggregation)?;

    let mut aggregate = AggregateSignature::from_signature(&parse_signature(first)?);
    for sig in rest {
        aggregate
            .add_signature(&parse_signature(sig)?, true)
            .map_err(|e| BlsError::Internal(format!("{:?}", e)))?;
    }

    Ok(BlsSignature {
        bytes: aggregate.to_signature().to_bytes(),
    })
}

/// Aggregate multiple G2 public keys into one.
pub fn aggregate_g2_pubkeys(public_keys: &[G2PublicKey]) -> Result<G2PublicKey, BlsError> {
    if public_keys.is_empty() {
        return Err(BlsError::EmptyAggregation);
    }

    let pks = public_keys
        .iter()
        .map(parse_g2_pubkey)
        .collect::<Result<Vec<_>, _>>()?;
    let pk_refs: Vec<&PublicKey> = pks.iter().collect();

    let aggregate = AggregatePublicKey::aggregate(&pk_refs, true)
        .map_err(|e| BlsError::Internal(format!("{:?}", e)))?;

    Ok(G2PublicKey {
        bytes: aggregate.to_public_key().to_bytes(),
    })
}

/// Aggregate multiple G1 public keys into one (quorum APKs).
pub fn aggregate_g1_pubkeys(public_keys: &[G1PublicKey]) -> Result<G1PublicKey, BlsError> {
    use blst::min_pk::{AggregatePublicKey as G1AggregatePublicKey, PublicKey as G1Key};

    if public_keys.is_empty() {
        return Err(BlsError::EmptyAggregation);
    }

    let pks = public_keys
        .iter()
        .map(|pk| G1Key::from_bytes(&pk.bytes).map_err(|_| BlsError::InvalidPublicKey))
        .collect::<Result<Vec<_>, _>>()?;
    let pk_refs: Vec<&G1Key> = pks.iter().collect();

    let aggregate = G1AggregatePublicKey::aggregate(&pk_refs, true)
        .map_err(|e| BlsError::Internal(format!("{:?}", e)))?;

    Ok(G1PublicKey {
        bytes: aggregate.to_public_key().to_bytes(),
    })
}
