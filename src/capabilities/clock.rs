//! Time sources. The controller never reads the wall clock directly; it
//! goes through [`Clock`] so tests can drive time deterministically.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::UnixTimeMs;

pub trait Clock: Send + Sync {
    fn now(&self) -> UnixTimeMs;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> UnixTimeMs {
        UnixTimeMs::now()
    }
}

/// Wall-clock epoch captured once, advanced by the runtime's monotonic clock.
/// Under a paused test runtime this follows the mock clock, so timestamps and
/// timers stay coherent.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    base_ms: u64,
    started: tokio::time::Instant,
}

impl MonotonicClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            base_ms: UnixTimeMs::now().0,
            started: tokio::time::Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> UnixTimeMs {
        let elapsed = self.started.elapsed().as_millis() as u64;
        UnixTimeMs(self.base_ms.saturating_add(elapsed))
    }
}

/// Hand-cranked clock for tests.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_ms: Arc<AtomicU64>,
}

impl ManualClock {
    #[must_use]
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now_ms.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, ms: u64) {
        self.now_ms.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> UnixTimeMs {
        UnixTimeMs(self.now_ms.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(1_000);
        assert_eq!(clock.now(), UnixTimeMs(1_000));
        clock.advance(250);
        assert_eq!(clock.now(), UnixTimeMs(1_250));
        clock.set(99);
        assert_eq!(clock.now(), UnixTimeMs(99));
    }

    #[test]
    fn shared_handles_see_the_same_time() {
        let clock = ManualClock::new(0);
        let other = clock.clone();
        clock.advance(42);
        assert_eq!(other.now(), UnixTimeMs(42));
    }

    #[test]
    fn system_clock_reads_the_epoch() {
        // Anything after 2020 is good enough to prove it is not zeroed.
        assert!(SystemClock.now().0 > 1_577_836_800_000);
    }
}
