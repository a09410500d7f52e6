//! Trust Ledger
//!
//! Peer attestation ledger: users vouch for (or against) each other under
//! administrator-defined categories, and each user carries an integer trust
//! score that decays while the record sits idle.
//!
//! ## Module Structure
//!
//! ```text
//! src/
//! ├── lib.rs         - Crate root with re-exports
//! ├── main.rs        - Server entrypoint
//! ├── config.rs      - Configuration management
//! ├── reputation/    - Attestation and scoring core
//! │   ├── types.rs    - Principals and bounded text
//! │   ├── score.rs    - Score formula & reputation records
//! │   ├── store.rs    - Reputation records by user
//! │   ├── ledger.rs   - Attestations & cooldown
//! │   ├── category.rs - Categories & per-user counters
//! │   ├── decay.rs    - Idle-time decay
//! │   ├── state.rs    - Aggregate state and its operations
//! │   ├── events.rs   - Bounded event log
//! │   ├── clock.rs    - Time sources
//! │   └── manager.rs  - Async orchestrator
//! ├── api/           - HTTP API endpoints
//! │   ├── reputation.rs - Reputation endpoints
//! │   └── middleware.rs - Auth, rate limiting, headers, logging
//! └── database/      - JSON snapshot persistence
//! ```

pub mod api;
pub mod config;
pub mod database;
pub mod reputation;

// Re-export main types for convenience
pub use config::LedgerConfig;
pub use database::SnapshotRepository;

// Re-export API types
pub use api::{
    create_app, create_reputation_router, ApiError, ReputationApiState,
    SecurityMiddlewareConfig, SecurityState,
};

// Re-export reputation types
pub use reputation::{
    AttestationReceipt, AttestationRecord, AttestationRequest, Category, CategoryId, CategoryName,
    Clock, Comment, DecayOutcome, InputError, ManualClock, Principal, ReputationError,
    ReputationManager, ReputationRecord, ReputationResult, ReputationState, SystemClock,
    Timestamp, Vote,
};
