//! Persistence Module
//!
//! Durable storage for the reputation state.

pub mod snapshot;

pub use snapshot::SnapshotRepository;
