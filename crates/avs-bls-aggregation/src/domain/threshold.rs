//! Stake threshold evaluation.
//!
//! Mirrors the on-chain check `signed * 100 >= total * threshold` exactly.
//! Products are computed in 512 bits so no stake value can overflow.

use super::entities::QuorumNum;
use primitive_types::U256;
use std::collections::HashMap;

/// Returns true when every required quorum meets its percentage threshold.
///
/// A quorum fails when no signed stake has been recorded for it, or when its
/// total stake is unknown.
pub fn check_stake_thresholds(
    signed_stake_per_quorum: &HashMap<QuorumNum, U256>,
    total_stake_per_quorum: &HashMap<QuorumNum, U256>,
    threshold_percentages: &HashMap<QuorumNum, u8>,
) -> bool {
    threshold_percentages.iter().all(|(quorum, threshold)| {
        let Some(signed) = signed_stake_per_quorum.get(quorum) else {
            return false;
        };
        let Some(total) = total_stake_per_quorum.get(quorum) else {
            return false;
        };
        quorum_meets_threshold(*signed, *total, *threshold)
    })
}

/// Single-quorum comparison.
pub fn quorum_meets_threshold(signed: U256, total: U256, threshold_percentage: u8) -> bool {
    signed.full_mul(U256::from(100u8)) >= total.full_mul(U256::from(threshold_percentage))
}
