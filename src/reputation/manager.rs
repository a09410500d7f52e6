//! Reputation Manager - Main Orchestrator
//!
//! Serializes every top-level operation against the shared state, reads the
//! transaction time once per operation, records committed transitions in the
//! event log, and optionally snapshots the state to disk.

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::database::snapshot::SnapshotRepository;
use crate::reputation::{
    AttestationReceipt, AttestationRecord, AttestationRequest, Category, CategoryId,
    CategoryName, Clock, DecayOutcome, EventLog, DEFAULT_MAX_EVENTS, Principal, ReputationEvent,
    ReputationEventKind, ReputationRecord, ReputationResult, ReputationState, SystemClock,
};

/// State and event log guarded together so events follow commit order
struct Ledger {
    state: ReputationState,
    events: EventLog,
}

/// Cloneable handle; clones share the same state
#[derive(Clone)]
pub struct ReputationManager {
    ledger: Arc<RwLock<Ledger>>,
    clock: Arc<dyn Clock>,
    snapshots: Option<Arc<SnapshotRepository>>,
}

impl ReputationManager {
    pub fn new(administrator: Principal) -> Self {
        Self::from_state(ReputationState::new(administrator), DEFAULT_MAX_EVENTS)
    }

    /// Resume from previously persisted state.
    ///
    /// The clock never reports a time earlier than the latest one stored,
    /// even if the wall clock is now behind it.
    pub fn from_state(state: ReputationState, max_events: usize) -> Self {
        let clock = SystemClock::starting_at(state.latest_timestamp());
        Self {
            ledger: Arc::new(RwLock::new(Ledger {
                state,
                events: EventLog::new(max_events),
            })),
            clock: Arc::new(clock),
            snapshots: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_snapshots(mut self, snapshots: Arc<SnapshotRepository>) -> Self {
        self.snapshots = Some(snapshots);
        self
    }

    /// Create the caller's reputation record if absent. Always succeeds.
    pub async fn initialize_reputation(&self, caller: &Principal) -> bool {
        let mut ledger = self.ledger.write().await;
        let now = self.clock.now();

        let created = ledger.state.initialize_reputation(caller, now);
        ledger.events.record(
            now,
            ReputationEventKind::ReputationInitialized {
                user: caller.clone(),
                created,
            },
        );

        if created {
            info!(user = %caller, "Reputation initialized");
        } else {
            debug!(user = %caller, "Reputation already initialized");
        }

        created
    }

    pub async fn add_category(
        &self,
        caller: &Principal,
        name: CategoryName,
    ) -> ReputationResult<CategoryId> {
        let mut ledger = self.ledger.write().await;
        let now = self.clock.now();

        let category_id = ledger.state.add_category(caller, name.clone())?;
        ledger
            .events
            .record(now, ReputationEventKind::CategoryAdded { category_id, name: name.clone() });

        info!(category_id, name = %name, "Category added");
        Ok(category_id)
    }

    pub async fn make_attestation(
        &self,
        request: AttestationRequest,
    ) -> ReputationResult<AttestationReceipt> {
        let mut ledger = self.ledger.write().await;
        let now = self.clock.now();

        let sender = request.sender.clone();
        let target = request.target.clone();

        let receipt = ledger.state.make_attestation(request, now).map_err(|e| {
            warn!(sender = %sender, target = %target, error = %e, "Attestation rejected");
            e
        })?;

        ledger.events.record(
            now,
            ReputationEventKind::AttestationRecorded {
                sender,
                target,
                vote: receipt.vote,
                category_id: receipt.category_id,
                score: receipt.reputation.score,
            },
        );

        Ok(receipt)
    }

    pub async fn apply_reputation_decay(&self, user: &Principal) -> ReputationResult<DecayOutcome> {
        let mut ledger = self.ledger.write().await;
        let now = self.clock.now();

        let outcome = ledger.state.apply_reputation_decay(user, now)?;

        if let DecayOutcome::Applied {
            retention_percent,
            ref record,
            ..
        } = outcome
        {
            ledger.events.record(
                now,
                ReputationEventKind::DecayApplied {
                    user: user.clone(),
                    retention_percent,
                    score: record.score,
                },
            );
            info!(user = %user, retention_percent, score = record.score, "Reputation decayed");
        }

        Ok(outcome)
    }

    pub async fn get_reputation(&self, user: &Principal) -> Option<ReputationRecord> {
        let ledger = self.ledger.read().await;
        ledger.state.get_reputation(user).cloned()
    }

    pub async fn get_attestation(
        &self,
        sender: &Principal,
        target: &Principal,
    ) -> Option<AttestationRecord> {
        let ledger = self.ledger.read().await;
        ledger.state.get_attestation(sender, target).cloned()
    }

    /// Latest attestation from every sender about `target`
    pub async fn attestations_received(&self, target: &Principal) -> Vec<AttestationRecord> {
        let ledger = self.ledger.read().await;
        ledger
            .state
            .attestations()
            .attestations_for(target)
            .cloned()
            .collect()
    }

    pub async fn get_category(&self, id: CategoryId) -> Option<Category> {
        let ledger = self.ledger.read().await;
        ledger.state.get_category(id).cloned()
    }

    pub async fn get_user_category_count(&self, user: &Principal, id: CategoryId) -> u64 {
        let ledger = self.ledger.read().await;
        ledger.state.get_user_category_count(user, id)
    }

    /// Newest first
    pub async fn recent_events(&self, limit: usize) -> Vec<ReputationEvent> {
        let ledger = self.ledger.read().await;
        ledger.events.recent(limit)
    }

    /// Newest first
    pub async fn events_for_user(&self, user: &Principal, limit: usize) -> Vec<ReputationEvent> {
        let ledger = self.ledger.read().await;
        ledger.events.for_user(user, limit)
    }

    pub async fn administrator(&self) -> Principal {
        let ledger = self.ledger.read().await;
        ledger.state.administrator().clone()
    }

    /// Consistent copy of the full state
    pub async fn snapshot(&self) -> ReputationState {
        let ledger = self.ledger.read().await;
        ledger.state.clone()
    }

    /// Write a snapshot if a repository is configured
    pub async fn persist(&self) -> Result<()> {
        let Some(ref snapshots) = self.snapshots else {
            return Ok(());
        };

        let _guard = snapshots.lock().await;
        let state = self.snapshot().await;
        snapshots.save(&state).await?;

        debug!(
            users = state.reputations().len(),
            attestations = state.attestations().len(),
            "Reputation snapshot persisted"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reputation::{Comment, ManualClock, ReputationError, ATTESTATION_COOLDOWN};

    fn p(name: &str) -> Principal {
        Principal::new(name).unwrap()
    }

    fn request(sender: &str, target: &str, value: i64) -> AttestationRequest {
        AttestationRequest {
            sender: p(sender),
            target: p(target),
            value,
            category_id: 1,
            comment: Comment::new("solid work").unwrap(),
        }
    }

    async fn manager_at(start: u64) -> (ReputationManager, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start));
        let manager = ReputationManager::new(p("deployer")).with_clock(clock.clone());
        manager
            .add_category(&p("deployer"), CategoryName::new("general").unwrap())
            .await
            .unwrap();
        (manager, clock)
    }

    #[tokio::test]
    async fn test_attestation_uses_clock_time() {
        let (manager, _clock) = manager_at(1000).await;

        manager.make_attestation(request("alice", "bob", 1)).await.unwrap();

        let record = manager.get_reputation(&p("bob")).await.unwrap();
        assert_eq!(record.score, 100);
        assert_eq!(record.last_updated, 1000);
    }

    #[tokio::test]
    async fn test_cooldown_through_manager() {
        let (manager, clock) = manager_at(1000).await;
        manager.make_attestation(request("alice", "bob", 1)).await.unwrap();

        clock.advance(ATTESTATION_COOLDOWN);
        assert_eq!(
            manager.make_attestation(request("alice", "bob", 1)).await,
            Err(ReputationError::CooldownActive)
        );

        clock.advance(1);
        assert!(manager.make_attestation(request("alice", "bob", 1)).await.is_ok());
    }

    #[tokio::test]
    async fn test_failed_operations_emit_no_events() {
        let (manager, _clock) = manager_at(0).await;
        let before = manager.recent_events(100).await.len();

        let _ = manager.make_attestation(request("alice", "alice", 1)).await;
        let _ = manager
            .add_category(&p("mallory"), CategoryName::new("x").unwrap())
            .await;
        let _ = manager.apply_reputation_decay(&p("ghost")).await;

        assert_eq!(manager.recent_events(100).await.len(), before);
    }

    #[tokio::test]
    async fn test_decay_event_only_when_applied() {
        let (manager, clock) = manager_at(0).await;
        manager.make_attestation(request("alice", "bob", 1)).await.unwrap();

        clock.set(29 * 86_400);
        let outcome = manager.apply_reputation_decay(&p("bob")).await.unwrap();
        assert!(!outcome.applied());

        clock.set(30 * 86_400);
        let outcome = manager.apply_reputation_decay(&p("bob")).await.unwrap();
        assert!(outcome.applied());

        let events = manager.events_for_user(&p("bob"), 10).await;
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[0].kind,
            ReputationEventKind::DecayApplied { retention_percent: 95, .. }
        ));
    }

    #[tokio::test]
    async fn test_concurrent_attestations_serialize() {
        let (manager, _clock) = manager_at(5000).await;

        let mut handles = Vec::new();
        for i in 0..20 {
            let manager = manager.clone();
            handles.push(tokio::spawn(async move {
                let value = if i % 2 == 0 { 1 } else { -1 };
                manager
                    .make_attestation(request(&format!("sender{}", i), "target", value))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let record = manager.get_reputation(&p("target")).await.unwrap();
        assert_eq!(record.positive_count, 10);
        assert_eq!(record.negative_count, 10);
        assert_eq!(record.score, 50);
        assert_eq!(manager.get_user_category_count(&p("target"), 1).await, 20);
    }

    #[tokio::test]
    async fn test_resume_with_wall_clock_behind_state() {
        let future = 4_000_000_000;
        let mut state = ReputationState::new(p("deployer"));
        state
            .add_category(&p("deployer"), CategoryName::new("general").unwrap())
            .unwrap();
        state.make_attestation(request("alice", "bob", 1), future).unwrap();

        let manager = ReputationManager::from_state(state, DEFAULT_MAX_EVENTS);
        let receipt = manager.make_attestation(request("carol", "bob", 1)).await.unwrap();

        assert_eq!(receipt.reputation.last_updated, future);
        assert_eq!(receipt.attestation.timestamp, future);
    }

    #[tokio::test]
    async fn test_persist_without_repository_is_noop() {
        let (manager, _clock) = manager_at(0).await;
        assert!(manager.persist().await.is_ok());
    }
}
