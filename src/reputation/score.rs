//! Reputation Records and Score Calculation
//!
//! A score is the share of positive attestations among all counted
//! attestations, expressed as a whole percentage. Division truncates;
//! there is no floating point anywhere on this path, so every replica
//! derives the same score from the same counts.

use serde::{Deserialize, Serialize};

use super::types::{Principal, Timestamp};

pub const MIN_SCORE: u8 = 0;
pub const MAX_SCORE: u8 = 100;

/// Score of a user with no counted attestations
pub const DEFAULT_SCORE: u8 = 50;

/// Map accumulated counts to a score in `[MIN_SCORE, MAX_SCORE]`.
///
/// `floor(positive * 100 / (positive + negative))`, or [`DEFAULT_SCORE`]
/// when both counts are zero. Arithmetic is widened to `u128` so the
/// function is total over every `u64` input.
pub fn calculate_score(positive: u64, negative: u64) -> u8 {
    let total = u128::from(positive) + u128::from(negative);
    if total == 0 {
        return DEFAULT_SCORE;
    }

    let positive_weight = u128::from(positive) * 100 / total;

    // Unreachable for the formula above, kept so the bound holds by construction
    positive_weight.clamp(u128::from(MIN_SCORE), u128::from(MAX_SCORE)) as u8
}

/// Per-user reputation state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationRecord {
    pub owner: Principal,

    /// Always within `[MIN_SCORE, MAX_SCORE]`
    pub score: u8,

    pub positive_count: u64,
    pub negative_count: u64,

    /// Never moves backwards
    pub last_updated: Timestamp,
}

impl ReputationRecord {
    /// Neutral record: score 50, no counted attestations
    pub fn new(owner: Principal, now: Timestamp) -> Self {
        Self {
            owner,
            score: DEFAULT_SCORE,
            positive_count: 0,
            negative_count: 0,
            last_updated: now,
        }
    }

    /// Copy of this record with new counts, the score derived from them
    /// and `last_updated` moved to `now`
    pub fn with_counts(&self, positive_count: u64, negative_count: u64, now: Timestamp) -> Self {
        Self {
            owner: self.owner.clone(),
            score: calculate_score(positive_count, negative_count),
            positive_count,
            negative_count,
            last_updated: now,
        }
    }

    pub fn total_attestations(&self) -> u64 {
        self.positive_count.saturating_add(self.negative_count)
    }
}
