//! Time-based decay of accumulated attestation counts
//!
//! Every full 30-day month since a record was last touched removes 5% of
//! both counts, capped at 75%. Counts are decayed independently and each
//! result is truncated, so the positive/negative ratio (and therefore the
//! score) can shift slightly after a decay. That shift is expected.

use tracing::debug;

use super::error::{ReputationError, ReputationResult};
use super::score::ReputationRecord;
use super::store::ReputationStore;
use super::types::{Principal, Timestamp};

pub const SECONDS_PER_DAY: u64 = 86_400;
pub const DAYS_PER_MONTH: u64 = 30;

/// Minimum idle days before decay does anything
pub const DECAY_THRESHOLD_DAYS: u64 = 30;

/// Percent removed per elapsed month
pub const MONTHLY_DECAY_RATE: u64 = 5;

/// Upper bound on the percent removed
pub const MAX_DECAY: u64 = 75;

/// Percent of the original counts retained after `days_passed` idle days.
///
/// Always within `[100 - MAX_DECAY, 100]`.
pub fn calculate_decay_factor(days_passed: u64) -> u64 {
    let months_elapsed = days_passed / DAYS_PER_MONTH;
    let decay_percent = months_elapsed
        .saturating_mul(MONTHLY_DECAY_RATE)
        .min(MAX_DECAY);
    100 - decay_percent
}

/// `floor(original * retention_percent / 100)`
pub fn calculate_decayed_value(original: u64, retention_percent: u64) -> u64 {
    let decayed = u128::from(original) * u128::from(retention_percent) / 100;
    u64::try_from(decayed).unwrap_or(u64::MAX)
}

/// Whole days between `last_updated` and `now`, zero if the clock is behind
pub fn days_since(last_updated: Timestamp, now: Timestamp) -> u64 {
    now.saturating_sub(last_updated) / SECONDS_PER_DAY
}

/// Result of a decay request that found its record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecayOutcome {
    /// Threshold not reached; nothing was written
    NotDue { days_elapsed: u64 },
    /// Counts were decayed and the record committed
    Applied {
        days_elapsed: u64,
        retention_percent: u64,
        record: ReputationRecord,
    },
}

impl DecayOutcome {
    pub fn applied(&self) -> bool {
        matches!(self, DecayOutcome::Applied { .. })
    }
}

/// Decay the counts of `user` if the record has been idle long enough.
///
/// Fails with `NotFound` when the user has no record. All reads happen
/// before the single write, so a failure never leaves a partial update.
pub fn apply_decay(
    store: &mut ReputationStore,
    user: &Principal,
    now: Timestamp,
) -> ReputationResult<DecayOutcome> {
    let current = store.get(user).ok_or(ReputationError::NotFound)?;

    let days_elapsed = days_since(current.last_updated, now);
    if days_elapsed < DECAY_THRESHOLD_DAYS {
        debug!(user = %user, days_elapsed, "Decay not due");
        return Ok(DecayOutcome::NotDue { days_elapsed });
    }

    let retention_percent = calculate_decay_factor(days_elapsed);
    let decayed_positive = calculate_decayed_value(current.positive_count, retention_percent);
    let decayed_negative = calculate_decayed_value(current.negative_count, retention_percent);
    let record = current.with_counts(decayed_positive, decayed_negative, now);

    store.upsert(record.clone());

    debug!(
        user = %user,
        days_elapsed,
        retention_percent,
        score = record.score,
        "Decay applied"
    );

    Ok(DecayOutcome::Applied {
        days_elapsed,
        retention_percent,
        record,
    })
}
