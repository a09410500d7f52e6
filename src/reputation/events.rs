//! Event log of committed reputation transitions
//!
//! Bounded in-memory ring: oldest events are dropped once `max_events` is
//! exceeded. Only successful transitions are recorded.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::ledger::Vote;
use super::types::{CategoryId, CategoryName, Principal, Timestamp};

pub const DEFAULT_MAX_EVENTS: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReputationEventKind {
    ReputationInitialized {
        user: Principal,
        /// `false` when the record already existed
        created: bool,
    },
    CategoryAdded {
        category_id: CategoryId,
        name: CategoryName,
    },
    AttestationRecorded {
        sender: Principal,
        target: Principal,
        vote: Vote,
        category_id: CategoryId,
        score: u8,
    },
    DecayApplied {
        user: Principal,
        retention_percent: u64,
        score: u8,
    },
}

impl ReputationEventKind {
    /// Whether `user` is a party to this event
    pub fn involves(&self, user: &Principal) -> bool {
        match self {
            ReputationEventKind::ReputationInitialized { user: u, .. } => u == user,
            ReputationEventKind::CategoryAdded { .. } => false,
            ReputationEventKind::AttestationRecorded { sender, target, .. } => {
                sender == user || target == user
            }
            ReputationEventKind::DecayApplied { user: u, .. } => u == user,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationEvent {
    /// Strictly increasing, starts at 1
    pub sequence: u64,
    pub timestamp: Timestamp,
    #[serde(flatten)]
    pub kind: ReputationEventKind,
}

#[derive(Debug, Clone)]
pub struct EventLog {
    events: VecDeque<ReputationEvent>,
    max_events: usize,
    next_sequence: u64,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_EVENTS)
    }
}

impl EventLog {
    pub fn new(max_events: usize) -> Self {
        Self {
            events: VecDeque::new(),
            max_events: max_events.max(1),
            next_sequence: 1,
        }
    }

    pub fn record(&mut self, timestamp: Timestamp, kind: ReputationEventKind) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        self.events.push_back(ReputationEvent {
            sequence,
            timestamp,
            kind,
        });

        while self.events.len() > self.max_events {
            self.events.pop_front();
        }

        sequence
    }

    /// Newest first
    pub fn recent(&self, limit: usize) -> Vec<ReputationEvent> {
        self.events.iter().rev().take(limit).cloned().collect()
    }

    /// Newest first
    pub fn for_user(&self, user: &Principal, limit: usize) -> Vec<ReputationEvent> {
        self.events
            .iter()
            .rev()
            .filter(|event| event.kind.involves(user))
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(name: &str) -> Principal {
        Principal::new(name).unwrap()
    }

    fn init(user: &str) -> ReputationEventKind {
        ReputationEventKind::ReputationInitialized {
            user: p(user),
            created: true,
        }
    }

    #[test]
    fn test_ring_evicts_oldest() {
        let mut log = EventLog::new(2);
        log.record(1, init("a"));
        log.record(2, init("b"));
        log.record(3, init("c"));

        let recent = log.recent(10);
        assert_eq!(log.len(), 2);
        assert_eq!(recent[0].sequence, 3);
        assert_eq!(recent[1].sequence, 2);
    }

    #[test]
    fn test_for_user_filters_parties() {
        let mut log = EventLog::default();
        log.record(1, init("alice"));
        log.record(
            2,
            ReputationEventKind::AttestationRecorded {
                sender: p("alice"),
                target: p("bob"),
                vote: Vote::Positive,
                category_id: 1,
                score: 100,
            },
        );
        log.record(
            3,
            ReputationEventKind::CategoryAdded {
                category_id: 2,
                name: CategoryName::new("ops").unwrap(),
            },
        );

        assert_eq!(log.for_user(&p("alice"), 10).len(), 2);
        assert_eq!(log.for_user(&p("bob"), 10).len(), 1);
        assert_eq!(log.for_user(&p("carol"), 10).len(), 0);
        assert_eq!(log.recent(1)[0].timestamp, 3);
    }

    #[test]
    fn test_event_json_shape() {
        let event = ReputationEvent {
            sequence: 7,
            timestamp: 99,
            kind: ReputationEventKind::DecayApplied {
                user: p("bob"),
                retention_percent: 95,
                score: 100,
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "decay_applied");
        assert_eq!(json["sequence"], 7);
        assert_eq!(json["user"], "bob");
    }
}
