//! Transaction time sources
//!
//! The core never reads time itself. The manager asks a [`Clock`] once per
//! operation and passes the value down.

use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::types::Timestamp;

pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock unix seconds that never go backwards.
///
/// If the system clock steps back, the last returned value is repeated
/// until wall time catches up, keeping `last_updated` monotonic.
#[derive(Debug, Default)]
pub struct SystemClock {
    last: AtomicU64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clock that never reports less than `floor`, used when resuming
    /// state whose timestamps may be ahead of the wall clock
    pub fn starting_at(floor: Timestamp) -> Self {
        Self {
            last: AtomicU64::new(floor),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let wall = u64::try_from(Utc::now().timestamp()).unwrap_or(0);
        let previous = self.last.fetch_max(wall, Ordering::SeqCst);
        previous.max(wall)
    }
}

/// Externally driven clock for tests and replays
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: u64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_monotonic() {
        let clock = SystemClock::new();
        // simulate a previously observed time far in the future
        clock.last.store(u64::MAX - 1, Ordering::SeqCst);
        assert_eq!(clock.now(), u64::MAX - 1);

        let fresh = SystemClock::new();
        let first = fresh.now();
        assert!(first > 1_600_000_000);
        assert!(fresh.now() >= first);
    }

    #[test]
    fn test_starting_at_floor() {
        let clock = SystemClock::starting_at(4_000_000_000);
        assert_eq!(clock.now(), 4_000_000_000);

        // A floor in the past defers to wall time
        let clock = SystemClock::starting_at(1000);
        assert!(clock.now() > 1_600_000_000);
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(1000);
        assert_eq!(clock.now(), 1000);
        clock.advance(86_400);
        assert_eq!(clock.now(), 87_400);
        clock.set(5);
        assert_eq!(clock.now(), 5);
    }
}
