//! Complete reputation state and its top-level operations
//!
//! One value of [`ReputationState`] is the whole persisted layout: reputation
//! records, latest attestations, categories with their counters, and the
//! category-id counter. Every mutating method is a single serializable
//! transition taking `now` as an argument; nothing here reads a clock.

use serde::{Deserialize, Serialize};

use super::category::{Category, CategoryIndex};
use super::decay::{self, DecayOutcome};
use super::error::ReputationResult;
use super::ledger::{AttestationLedger, AttestationReceipt, AttestationRecord, AttestationRequest};
use super::score::ReputationRecord;
use super::store::ReputationStore;
use super::types::{CategoryId, CategoryName, Principal, Timestamp};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationState {
    reputations: ReputationStore,
    attestations: AttestationLedger,
    categories: CategoryIndex,
}

impl ReputationState {
    /// Empty state administered by `administrator` (the deploying principal)
    pub fn new(administrator: Principal) -> Self {
        Self {
            reputations: ReputationStore::new(),
            attestations: AttestationLedger::new(),
            categories: CategoryIndex::new(administrator),
        }
    }

    pub fn administrator(&self) -> &Principal {
        self.categories.administrator()
    }

    /// Returns `true` if a record was created, `false` if one already existed
    pub fn initialize_reputation(&mut self, caller: &Principal, now: Timestamp) -> bool {
        self.reputations.initialize(caller, now)
    }

    pub fn add_category(
        &mut self,
        caller: &Principal,
        name: CategoryName,
    ) -> ReputationResult<CategoryId> {
        self.categories.add_category(caller, name)
    }

    pub fn make_attestation(
        &mut self,
        request: AttestationRequest,
        now: Timestamp,
    ) -> ReputationResult<AttestationReceipt> {
        self.attestations.make_attestation(
            &mut self.reputations,
            &mut self.categories,
            request,
            now,
        )
    }

    pub fn apply_reputation_decay(
        &mut self,
        user: &Principal,
        now: Timestamp,
    ) -> ReputationResult<DecayOutcome> {
        decay::apply_decay(&mut self.reputations, user, now)
    }

    pub fn get_reputation(&self, user: &Principal) -> Option<&ReputationRecord> {
        self.reputations.get(user)
    }

    pub fn get_attestation(
        &self,
        sender: &Principal,
        target: &Principal,
    ) -> Option<&AttestationRecord> {
        self.attestations.get_attestation(sender, target)
    }

    pub fn get_category(&self, id: CategoryId) -> Option<&Category> {
        self.categories.get_category(id)
    }

    pub fn get_user_category_count(&self, user: &Principal, id: CategoryId) -> u64 {
        self.categories.get_category_count(user, id)
    }

    /// Latest transaction time recorded anywhere in the state
    pub fn latest_timestamp(&self) -> Timestamp {
        let records = self.reputations.iter().map(|r| r.last_updated);
        let attestations = self.attestations.iter().map(|a| a.timestamp);
        records.chain(attestations).max().unwrap_or(0)
    }

    pub fn reputations(&self) -> &ReputationStore {
        &self.reputations
    }

    pub fn attestations(&self) -> &AttestationLedger {
        &self.attestations
    }

    pub fn categories(&self) -> &CategoryIndex {
        &self.categories
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reputation::decay::SECONDS_PER_DAY;
    use crate::reputation::error::ReputationError;
    use crate::reputation::types::Comment;

    fn p(name: &str) -> Principal {
        Principal::new(name).unwrap()
    }

    fn state_with_category() -> ReputationState {
        let mut state = ReputationState::new(p("deployer"));
        state
            .add_category(&p("deployer"), CategoryName::new("general").unwrap())
            .unwrap();
        state
    }

    fn attest(state: &mut ReputationState, sender: &str, target: &str, value: i64, now: Timestamp) {
        state
            .make_attestation(
                AttestationRequest {
                    sender: p(sender),
                    target: p(target),
                    value,
                    category_id: 1,
                    comment: Comment::default(),
                },
                now,
            )
            .unwrap();
    }

    #[test]
    fn test_latest_timestamp() {
        let mut state = state_with_category();
        assert_eq!(state.latest_timestamp(), 0);

        state.initialize_reputation(&p("dave"), 300);
        attest(&mut state, "alice", "bob", 1, 200);
        assert_eq!(state.latest_timestamp(), 300);

        attest(&mut state, "carol", "bob", 1, 900);
        assert_eq!(state.latest_timestamp(), 900);
    }

    #[test]
    fn test_initialize_twice_same_state() {
        let mut state = ReputationState::new(p("deployer"));

        assert!(state.initialize_reputation(&p("alice"), 100));
        let after_first = state.clone();
        assert!(!state.initialize_reputation(&p("alice"), 200));

        assert_eq!(state, after_first);
    }

    #[test]
    fn test_decay_does_not_touch_attestations_or_counts() {
        let mut state = state_with_category();
        attest(&mut state, "alice", "bob", 1, 0);
        attest(&mut state, "carol", "bob", 1, 0);

        let outcome = state
            .apply_reputation_decay(&p("bob"), 90 * SECONDS_PER_DAY)
            .unwrap();
        assert!(outcome.applied());

        // 2 * 85 / 100 = 1
        assert_eq!(state.get_reputation(&p("bob")).unwrap().positive_count, 1);
        assert_eq!(state.get_user_category_count(&p("bob"), 1), 2);
        assert_eq!(state.get_attestation(&p("alice"), &p("bob")).unwrap().timestamp, 0);
    }

    #[test]
    fn test_decay_unknown_user() {
        let mut state = ReputationState::new(p("deployer"));
        assert_eq!(
            state.apply_reputation_decay(&p("ghost"), 0),
            Err(ReputationError::NotFound)
        );
    }

    #[test]
    fn test_snapshot_round_trip_is_identical() {
        let mut state = state_with_category();
        attest(&mut state, "alice", "bob", 1, 10);
        attest(&mut state, "bob", "alice", -1, 11);
        state.initialize_reputation(&p("dave"), 12);

        let json = serde_json::to_string(&state).unwrap();
        let restored: ReputationState = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, state);
        assert_eq!(restored.administrator(), &p("deployer"));
    }
}
