//! Category Index
//!
//! Categories are created by the administrator only and are immutable.
//! Per-user counters record how many accepted attestations each user has
//! received in each category; they only ever grow.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use super::error::{ReputationError, ReputationResult};
use super::types::{CategoryId, CategoryName, Principal};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: CategoryName,
}

/// Persisted form of one `(user, category)` counter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub user: Principal,
    pub category_id: CategoryId,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "CategoryIndexSnapshot", into = "CategoryIndexSnapshot")]
pub struct CategoryIndex {
    administrator: Principal,
    /// Highest id handed out so far; ids are never reused
    last_category_id: CategoryId,
    categories: BTreeMap<CategoryId, Category>,
    counts: BTreeMap<(Principal, CategoryId), u64>,
}

impl CategoryIndex {
    pub fn new(administrator: Principal) -> Self {
        Self {
            administrator,
            last_category_id: 0,
            categories: BTreeMap::new(),
            counts: BTreeMap::new(),
        }
    }

    pub fn administrator(&self) -> &Principal {
        &self.administrator
    }

    /// Register a new category and return its id
    pub fn add_category(
        &mut self,
        requester: &Principal,
        name: CategoryName,
    ) -> ReputationResult<CategoryId> {
        if requester != &self.administrator {
            warn!(requester = %requester, "Rejected category creation by non-administrator");
            return Err(ReputationError::Unauthorized);
        }

        let id = self.last_category_id + 1;
        self.categories.insert(id, Category { id, name });
        self.last_category_id = id;

        Ok(id)
    }

    pub fn get_category(&self, id: CategoryId) -> Option<&Category> {
        self.categories.get(&id)
    }

    pub fn contains(&self, id: CategoryId) -> bool {
        self.categories.contains_key(&id)
    }

    /// Accepted attestations `user` has received in `id` (0 if none)
    pub fn get_category_count(&self, user: &Principal, id: CategoryId) -> u64 {
        self.counts
            .get(&(user.clone(), id))
            .copied()
            .unwrap_or(0)
    }

    /// Bump the counter and return the new value
    pub(crate) fn increment_count(&mut self, user: &Principal, id: CategoryId) -> u64 {
        let count = self.counts.entry((user.clone(), id)).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.categories.values()
    }

    pub fn last_category_id(&self) -> CategoryId {
        self.last_category_id
    }
}

#[derive(Serialize, Deserialize)]
struct CategoryIndexSnapshot {
    administrator: Principal,
    last_category_id: CategoryId,
    categories: Vec<Category>,
    counts: Vec<CategoryCount>,
}

impl From<CategoryIndexSnapshot> for CategoryIndex {
    fn from(snapshot: CategoryIndexSnapshot) -> Self {
        let categories: BTreeMap<_, _> = snapshot
            .categories
            .into_iter()
            .map(|category| (category.id, category))
            .collect();

        // The counter must stay ahead of every stored id
        let highest_stored = categories.keys().next_back().copied().unwrap_or(0);

        Self {
            administrator: snapshot.administrator,
            last_category_id: snapshot.last_category_id.max(highest_stored),
            categories,
            counts: snapshot
                .counts
                .into_iter()
                .map(|c| ((c.user, c.category_id), c.count))
                .collect(),
        }
    }
}

impl From<CategoryIndex> for CategoryIndexSnapshot {
    fn from(index: CategoryIndex) -> Self {
        Self {
            administrator: index.administrator,
            last_category_id: index.last_category_id,
            categories: index.categories.into_values().collect(),
            counts: index
                .counts
                .into_iter()
                .map(|((user, category_id), count)| CategoryCount {
                    user,
                    category_id,
                    count,
                })
                .collect(),
        }
    }
}
