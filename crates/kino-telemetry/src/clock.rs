//! Wall-clock time source
//!
//! Every timing field of a playback session (first buffering, first play,
//! seek start, rebuffer start) and every enrichment timestamp is read through
//! a [`Clock`], so tests can drive time explicitly with [`FakeClock`].

use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of wall-clock time in epoch milliseconds
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Real system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        Utc::now().timestamp_millis().max(0) as u64
    }
}

/// Manually driven clock for tests and script replay
#[derive(Debug, Default)]
pub struct FakeClock {
    now: AtomicU64,
}

impl FakeClock {
    pub fn new(initial_ms: u64) -> Self {
        Self {
            now: AtomicU64::new(initial_ms),
        }
    }

    /// Move time forward by `delta_ms`
    pub fn advance(&self, delta_ms: u64) {
        self.now.fetch_add(delta_ms, Ordering::SeqCst);
    }

    /// Jump to an absolute time. Going backwards is ignored.
    pub fn set(&self, now_ms: u64) {
        self.now.fetch_max(now_ms, Ordering::SeqCst);
    }
}

impl Clock for FakeClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fake_clock_advance() {
        let clock = FakeClock::new(10);
        assert_eq!(clock.now_ms(), 10);

        clock.advance(250);
        assert_eq!(clock.now_ms(), 260);
    }

    #[test]
    fn test_fake_clock_never_goes_back() {
        let clock = FakeClock::new(1_000);
        clock.set(500);
        assert_eq!(clock.now_ms(), 1_000);
        clock.set(1_500);
        assert_eq!(clock.now_ms(), 1_500);
    }

    #[test]
    fn test_system_clock_is_epoch_millis() {
        // 2020-01-01T00:00:00Z
        assert!(SystemClock.now_ms() > 1_577_836_800_000);
    }
}
