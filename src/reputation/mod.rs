//! Peer Attestation Reputation System
//!
//! Users attest to each other (positive, negative or abstaining) under an
//! administrator-defined category. Each user's score is the truncated
//! percentage of positive attestations received; idle records decay.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌───────────────────┐     ┌─────────────────┐
//! │ AttestationLedger│────►│ ReputationStore   │◄────│ decay           │
//! │ (cooldown, pairs)│     │ (per-user record) │     │ (idle months)   │
//! └──────────────────┘     └───────────────────┘     └─────────────────┘
//!          │                         ▲
//!          ▼                         │ score::calculate_score
//! ┌──────────────────┐     ┌───────────────────┐
//! │ CategoryIndex    │     │ ReputationManager │
//! │ (admin, counters)│     │ (lock, clock, log)│
//! └──────────────────┘     └───────────────────┘
//! ```
//!
//! ## Score Model
//!
//! - New records start at 50 with no counted attestations
//! - Score = floor(positive * 100 / (positive + negative))
//! - Same sender may re-attest to the same target only after 24 hours
//! - After 30 idle days both counts lose 5% per month, capped at 75%

mod category;
mod clock;
mod decay;
mod error;
mod events;
mod ledger;
mod manager;
mod score;
mod state;
mod store;
mod types;

pub use category::{Category, CategoryCount, CategoryIndex};
pub use clock::{Clock, ManualClock, SystemClock};
pub use decay::{
    apply_decay, calculate_decay_factor, calculate_decayed_value, days_since, DecayOutcome,
    DAYS_PER_MONTH, DECAY_THRESHOLD_DAYS, MAX_DECAY, MONTHLY_DECAY_RATE, SECONDS_PER_DAY,
};
pub use error::{ReputationError, ReputationResult};
pub use events::{EventLog, ReputationEvent, ReputationEventKind, DEFAULT_MAX_EVENTS};
pub use ledger::{
    AttestationLedger, AttestationReceipt, AttestationRecord, AttestationRequest, Vote,
    ATTESTATION_COOLDOWN,
};
pub use manager::ReputationManager;
pub use score::{calculate_score, ReputationRecord, DEFAULT_SCORE, MAX_SCORE, MIN_SCORE};
pub use state::ReputationState;
pub use store::ReputationStore;
pub use types::{
    CategoryId, CategoryName, Comment, InputError, Principal, Timestamp, MAX_CATEGORY_NAME_LENGTH,
    MAX_COMMENT_LENGTH, MAX_PRINCIPAL_LENGTH,
};
