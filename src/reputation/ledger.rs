//! Attestation Ledger
//!
//! Holds the latest attestation for every ordered `(sender, target)` pair
//! and drives the full attestation transition:
//!
//! 1. validate (self-attestation, category, cooldown) against read-only state
//! 2. stage every write the attestation implies
//! 3. commit the staged writes in one infallible step
//!
//! Validation never holds a mutable borrow, so a rejected attestation cannot
//! leave anything behind.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::category::CategoryIndex;
use super::error::{ReputationError, ReputationResult};
use super::score::ReputationRecord;
use super::store::ReputationStore;
use super::types::{CategoryId, Comment, Principal, Timestamp};

/// Seconds that must pass before the same sender may attest to the same target again
pub const ATTESTATION_COOLDOWN: u64 = 86_400;

/// Latest attestation from `sender` about `target`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationRecord {
    pub sender: Principal,
    pub target: Principal,
    /// Only the sign carries meaning
    pub value: i64,
    pub timestamp: Timestamp,
    pub comment: Comment,
}

impl AttestationRecord {
    /// First instant at which the same pair may attest again
    pub fn cooldown_ends_after(&self) -> Timestamp {
        self.timestamp.saturating_add(ATTESTATION_COOLDOWN)
    }

    pub fn vote(&self) -> Vote {
        Vote::from_value(self.value)
    }
}

/// Direction of an attestation, derived from the sign of its value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vote {
    Positive,
    Negative,
    /// Zero value: counts nothing but still refreshes the record and cooldown
    Abstain,
}

impl Vote {
    pub fn from_value(value: i64) -> Self {
        match value.signum() {
            1 => Vote::Positive,
            -1 => Vote::Negative,
            _ => Vote::Abstain,
        }
    }
}

/// Input to [`AttestationLedger::make_attestation`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestationRequest {
    pub sender: Principal,
    pub target: Principal,
    pub value: i64,
    pub category_id: CategoryId,
    pub comment: Comment,
}

/// What an accepted attestation committed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttestationReceipt {
    pub attestation: AttestationRecord,
    pub category_id: CategoryId,
    pub vote: Vote,
    /// Target's record after the commit
    pub reputation: ReputationRecord,
    /// Target's counter in `category_id` after the commit
    pub category_count: u64,
    /// Whether the target had no reputation record before this attestation
    pub created_reputation: bool,
}

/// Every write an accepted attestation performs, computed before any of them happens
struct StagedAttestation {
    attestation: AttestationRecord,
    reputation: ReputationRecord,
    category_id: CategoryId,
    vote: Vote,
    created_reputation: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<AttestationRecord>", into = "Vec<AttestationRecord>")]
pub struct AttestationLedger {
    attestations: BTreeMap<(Principal, Principal), AttestationRecord>,
}

impl AttestationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_attestation(
        &self,
        sender: &Principal,
        target: &Principal,
    ) -> Option<&AttestationRecord> {
        self.attestations.get(&(sender.clone(), target.clone()))
    }

    pub fn len(&self) -> usize {
        self.attestations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attestations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttestationRecord> {
        self.attestations.values()
    }

    /// Attestations currently on record about `target`
    pub fn attestations_for<'a>(
        &'a self,
        target: &'a Principal,
    ) -> impl Iterator<Item = &'a AttestationRecord> + 'a {
        self.attestations
            .values()
            .filter(move |record| &record.target == target)
    }

    /// Record an attestation and update the target's reputation and
    /// category counter, all or nothing.
    pub fn make_attestation(
        &mut self,
        reputations: &mut ReputationStore,
        categories: &mut CategoryIndex,
        request: AttestationRequest,
        now: Timestamp,
    ) -> ReputationResult<AttestationReceipt> {
        let staged = self.stage(reputations, categories, request, now)?;
        Ok(self.commit(reputations, categories, staged))
    }

    fn stage(
        &self,
        reputations: &ReputationStore,
        categories: &CategoryIndex,
        request: AttestationRequest,
        now: Timestamp,
    ) -> ReputationResult<StagedAttestation> {
        let AttestationRequest {
            sender,
            target,
            value,
            category_id,
            comment,
        } = request;

        if sender == target {
            return Err(ReputationError::SelfAttestation);
        }

        if !categories.contains(category_id) {
            return Err(ReputationError::NotFound);
        }

        if let Some(prior) = self.get_attestation(&sender, &target) {
            if now <= prior.cooldown_ends_after() {
                debug!(
                    sender = %sender,
                    target = %target,
                    prior = prior.timestamp,
                    now,
                    "Attestation within cooldown"
                );
                return Err(ReputationError::CooldownActive);
            }
        }

        let (current, created_reputation) = match reputations.get(&target) {
            Some(record) => (record.clone(), false),
            None => (ReputationRecord::new(target.clone(), now), true),
        };

        let vote = Vote::from_value(value);
        let (positive, negative) = match vote {
            Vote::Positive => (current.positive_count.saturating_add(1), current.negative_count),
            Vote::Negative => (current.positive_count, current.negative_count.saturating_add(1)),
            Vote::Abstain => (current.positive_count, current.negative_count),
        };

        // A late-arriving time must not move the record backwards
        let last_updated = now.max(current.last_updated);

        Ok(StagedAttestation {
            reputation: current.with_counts(positive, negative, last_updated),
            attestation: AttestationRecord {
                sender,
                target,
                value,
                timestamp: now,
                comment,
            },
            category_id,
            vote,
            created_reputation,
        })
    }

    fn commit(
        &mut self,
        reputations: &mut ReputationStore,
        categories: &mut CategoryIndex,
        staged: StagedAttestation,
    ) -> AttestationReceipt {
        let StagedAttestation {
            attestation,
            reputation,
            category_id,
            vote,
            created_reputation,
        } = staged;

        self.attestations.insert(
            (attestation.sender.clone(), attestation.target.clone()),
            attestation.clone(),
        );
        reputations.upsert(reputation.clone());
        let category_count = categories.increment_count(&attestation.target, category_id);

        info!(
            sender = %attestation.sender,
            target = %attestation.target,
            vote = ?vote,
            category_id,
            score = reputation.score,
            "Attestation recorded"
        );

        AttestationReceipt {
            attestation,
            category_id,
            vote,
            reputation,
            category_count,
            created_reputation,
        }
    }
}

impl From<Vec<AttestationRecord>> for AttestationLedger {
    fn from(records: Vec<AttestationRecord>) -> Self {
        Self {
            attestations: records
                .into_iter()
                .map(|record| ((record.sender.clone(), record.target.clone()), record))
                .collect(),
        }
    }
}

impl From<AttestationLedger> for Vec<AttestationRecord> {
    fn from(ledger: AttestationLedger) -> Self {
        ledger.attestations.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reputation::types::CategoryName;

    struct Fixture {
        ledger: AttestationLedger,
        reputations: ReputationStore,
        categories: CategoryIndex,
    }

    impl Fixture {
        fn new() -> Self {
            let admin = p("deployer");
            let mut categories = CategoryIndex::new(admin.clone());
            categories
                .add_category(&admin, CategoryName::new("general").unwrap())
                .unwrap();
            Self {
                ledger: AttestationLedger::new(),
                reputations: ReputationStore::new(),
                categories,
            }
        }

        fn attest(
            &mut self,
            sender: &str,
            target: &str,
            value: i64,
            now: Timestamp,
        ) -> ReputationResult<AttestationReceipt> {
            self.ledger.make_attestation(
                &mut self.reputations,
                &mut self.categories,
                request(sender, target, value, 1),
                now,
            )
        }

        fn snapshot(&self) -> (AttestationLedger, ReputationStore, CategoryIndex) {
            (
                self.ledger.clone(),
                self.reputations.clone(),
                self.categories.clone(),
            )
        }
    }

    fn p(name: &str) -> Principal {
        Principal::new(name).unwrap()
    }

    fn request(sender: &str, target: &str, value: i64, category_id: CategoryId) -> AttestationRequest {
        AttestationRequest {
            sender: p(sender),
            target: p(target),
            value,
            category_id,
            comment: Comment::new("good").unwrap(),
        }
    }

    #[test]
    fn test_vote_from_sign() {
        assert_eq!(Vote::from_value(1), Vote::Positive);
        assert_eq!(Vote::from_value(i64::MAX), Vote::Positive);
        assert_eq!(Vote::from_value(-7), Vote::Negative);
        assert_eq!(Vote::from_value(i64::MIN), Vote::Negative);
        assert_eq!(Vote::from_value(0), Vote::Abstain);
    }

    #[test]
    fn test_first_and_second_attestation() {
        let mut fx = Fixture::new();

        let receipt = fx.attest("alice", "bob", 1, 1000).unwrap();
        assert!(receipt.created_reputation);
        assert_eq!(receipt.category_count, 1);

        let record = fx.reputations.get(&p("bob")).unwrap();
        assert_eq!(
            (record.score, record.positive_count, record.negative_count, record.last_updated),
            (100, 1, 0, 1000)
        );

        let receipt = fx.attest("carol", "bob", -1, 1001).unwrap();
        assert!(!receipt.created_reputation);
        assert_eq!(receipt.category_count, 2);

        let record = fx.reputations.get(&p("bob")).unwrap();
        assert_eq!(
            (record.score, record.positive_count, record.negative_count, record.last_updated),
            (50, 1, 1, 1001)
        );
    }

    #[test]
    fn test_self_attestation_rejected_without_changes() {
        let mut fx = Fixture::new();
        let before = fx.snapshot();

        assert_eq!(
            fx.attest("alice", "alice", 1, 10),
            Err(ReputationError::SelfAttestation)
        );
        // self check precedes category check
        let result = fx.ledger.make_attestation(
            &mut fx.reputations,
            &mut fx.categories,
            request("alice", "alice", 1, 99),
            10,
        );
        assert_eq!(result, Err(ReputationError::SelfAttestation));
        assert_eq!(fx.snapshot(), before);
    }

    #[test]
    fn test_unknown_category_rejected_without_changes() {
        let mut fx = Fixture::new();
        let before = fx.snapshot();

        let result = fx.ledger.make_attestation(
            &mut fx.reputations,
            &mut fx.categories,
            request("alice", "bob", 1, 2),
            10,
        );

        assert_eq!(result, Err(ReputationError::NotFound));
        assert_eq!(fx.snapshot(), before);
        assert!(fx.reputations.get(&p("bob")).is_none());
    }

    #[test]
    fn test_cooldown_boundary() {
        let mut fx = Fixture::new();
        fx.attest("alice", "bob", 1, 1000).unwrap();
        let before = fx.snapshot();

        assert_eq!(
            fx.attest("alice", "bob", -1, 1000 + ATTESTATION_COOLDOWN),
            Err(ReputationError::CooldownActive)
        );
        assert_eq!(fx.snapshot(), before);

        let receipt = fx.attest("alice", "bob", -1, 1000 + ATTESTATION_COOLDOWN + 1).unwrap();
        assert_eq!(receipt.attestation.value, -1);
        assert_eq!(receipt.reputation.positive_count, 1);
        assert_eq!(receipt.reputation.negative_count, 1);
    }

    #[test]
    fn test_last_updated_never_moves_backwards() {
        let mut fx = Fixture::new();
        fx.attest("alice", "bob", 1, 1000).unwrap();

        let receipt = fx.attest("carol", "bob", -1, 500).unwrap();
        assert_eq!(receipt.reputation.last_updated, 1000);
        assert_eq!(receipt.reputation.negative_count, 1);
        assert_eq!(fx.reputations.get(&p("bob")).unwrap().last_updated, 1000);

        // The pair record keeps the time it was actually made
        let stored = fx.ledger.get_attestation(&p("carol"), &p("bob")).unwrap();
        assert_eq!(stored.timestamp, 500);
    }

    #[test]
    fn test_cooldown_is_per_ordered_pair() {
        let mut fx = Fixture::new();
        fx.attest("alice", "bob", 1, 1000).unwrap();

        // reverse direction and other senders are unaffected
        assert!(fx.attest("bob", "alice", 1, 1001).is_ok());
        assert!(fx.attest("carol", "bob", 1, 1002).is_ok());
    }

    #[test]
    fn test_abstain_refreshes_record_without_counting() {
        let mut fx = Fixture::new();
        fx.attest("alice", "bob", 1, 1000).unwrap();

        let receipt = fx.attest("alice", "bob", 0, 200_000).unwrap();
        assert_eq!(receipt.vote, Vote::Abstain);
        assert_eq!(receipt.reputation.positive_count, 1);
        assert_eq!(receipt.reputation.negative_count, 0);
        assert_eq!(receipt.reputation.last_updated, 200_000);
        assert_eq!(receipt.category_count, 2);

        let stored = fx.ledger.get_attestation(&p("alice"), &p("bob")).unwrap();
        assert_eq!(stored.value, 0);
        assert_eq!(stored.timestamp, 200_000);

        // cooldown restarts from the abstaining attestation
        assert_eq!(
            fx.attest("alice", "bob", 1, 200_000 + ATTESTATION_COOLDOWN),
            Err(ReputationError::CooldownActive)
        );
    }

    #[test]
    fn test_attestation_round_trip() {
        let mut fx = Fixture::new();
        fx.attest("alice", "bob", 1, 4242).unwrap();

        let stored = fx.ledger.get_attestation(&p("alice"), &p("bob")).unwrap();
        assert_eq!(stored.value, 1);
        assert_eq!(stored.comment.as_str(), "good");
        assert_eq!(stored.timestamp, 4242);
        assert!(fx.ledger.get_attestation(&p("bob"), &p("alice")).is_none());
    }

    #[test]
    fn test_magnitude_is_not_weighted() {
        let mut fx = Fixture::new();
        fx.attest("alice", "bob", 1_000_000, 10).unwrap();
        fx.attest("carol", "bob", -1, 11).unwrap();

        let record = fx.reputations.get(&p("bob")).unwrap();
        assert_eq!((record.positive_count, record.negative_count), (1, 1));
        assert_eq!(record.score, 50);
    }

    #[test]
    fn test_attestations_for_target() {
        let mut fx = Fixture::new();
        fx.attest("alice", "bob", 1, 10).unwrap();
        fx.attest("carol", "bob", 1, 11).unwrap();
        fx.attest("bob", "carol", 1, 12).unwrap();

        let bob = p("bob");
        assert_eq!(fx.ledger.attestations_for(&bob).count(), 2);
        assert_eq!(fx.ledger.len(), 3);
    }
}
