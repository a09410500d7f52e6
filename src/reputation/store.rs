//! Reputation Store - owns `user -> ReputationRecord`

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::score::ReputationRecord;
use super::types::{Principal, Timestamp};

/// Records are never deleted; writes go through [`ReputationStore::upsert`]
/// from the attestation ledger and decay engine only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<ReputationRecord>", into = "Vec<ReputationRecord>")]
pub struct ReputationStore {
    records: BTreeMap<Principal, ReputationRecord>,
}

impl ReputationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user: &Principal) -> Option<&ReputationRecord> {
        self.records.get(user)
    }

    pub fn contains(&self, user: &Principal) -> bool {
        self.records.contains_key(user)
    }

    /// Unconditional overwrite keyed by `record.owner`
    pub(crate) fn upsert(&mut self, record: ReputationRecord) {
        self.records.insert(record.owner.clone(), record);
    }

    /// Create a default record for `user` unless one already exists.
    ///
    /// Returns `true` when a record was created. Both paths succeed.
    pub fn initialize(&mut self, user: &Principal, now: Timestamp) -> bool {
        if self.records.contains_key(user) {
            return false;
        }
        self.records
            .insert(user.clone(), ReputationRecord::new(user.clone(), now));
        true
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReputationRecord> {
        self.records.values()
    }
}

impl From<Vec<ReputationRecord>> for ReputationStore {
    fn from(records: Vec<ReputationRecord>) -> Self {
        Self {
            records: records
                .into_iter()
                .map(|record| (record.owner.clone(), record))
                .collect(),
        }
    }
}

impl From<ReputationStore> for Vec<ReputationRecord> {
    fn from(store: ReputationStore) -> Self {
        store.records.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str) -> Principal {
        Principal::new(name).unwrap()
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let mut store = ReputationStore::new();

        assert!(store.initialize(&user("alice"), 100));
        let first = store.clone();

        assert!(!store.initialize(&user("alice"), 500));
        assert_eq!(store, first);
        assert_eq!(store.get(&user("alice")).unwrap().last_updated, 100);
    }

    #[test]
    fn test_upsert_overwrites() {
        let mut store = ReputationStore::new();
        store.initialize(&user("bob"), 0);

        let updated = store.get(&user("bob")).unwrap().with_counts(4, 0, 10);
        store.upsert(updated.clone());

        assert_eq!(store.get(&user("bob")), Some(&updated));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_missing_user() {
        let store = ReputationStore::new();
        assert!(store.get(&user("nobody")).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_serializes_as_record_list() {
        let mut store = ReputationStore::new();
        store.initialize(&user("alice"), 1);
        store.initialize(&user("bob"), 2);

        let json = serde_json::to_value(&store).unwrap();
        assert!(json.is_array());
        assert_eq!(json.as_array().unwrap().len(), 2);

        let restored: ReputationStore = serde_json::from_value(json).unwrap();
        assert_eq!(restored, store);
    }
}
