//! Cancellable one-shot timers, polled with explicit timestamps.
//!
//! Every time-based behaviour in the core (resize debouncing, long-press
//! detection) is built on [`DeadlineTimer`] rather than ad hoc closures over
//! runtime timer handles, so tests can drive the clock deterministically.

use crate::UnixTimeMs;

/// A fire-once deadline. Arming replaces any previous deadline; firing or
/// cancelling disarms it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeadlineTimer {
    deadline: Option<UnixTimeMs>,
}

impl DeadlineTimer {
    #[must_use]
    pub const fn idle() -> Self {
        Self { deadline: None }
    }

    pub fn arm(&mut self, now: UnixTimeMs, delay_ms: u64) {
        self.deadline = Some(now.add_millis(delay_ms));
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    #[must_use]
    pub const fn deadline(&self) -> Option<UnixTimeMs> {
        self.deadline
    }

    /// Returns `true` exactly once, on the first poll at or past the
    /// deadline. The timer disarms itself when it fires.
    pub fn fire(&mut self, now: UnixTimeMs) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Trailing-edge debouncer: bursts of submissions collapse into the last
/// value, released once `delay_ms` passes without a newer submission.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay_ms: u64,
    timer: DeadlineTimer,
    pending: Option<T>,
}

impl<T> Debouncer<T> {
    #[must_use]
    pub const fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            timer: DeadlineTimer::idle(),
            pending: None,
        }
    }

    /// Stores `value` and restarts the quiet-period timer.
    pub fn submit(&mut self, value: T, now: UnixTimeMs) {
        self.pending = Some(value);
        self.timer.arm(now, self.delay_ms);
    }

    /// Releases the pending value if the quiet period has elapsed.
    pub fn poll(&mut self, now: UnixTimeMs) -> Option<T> {
        if self.timer.fire(now) {
            self.pending.take()
        } else {
            None
        }
    }

    pub fn cancel(&mut self) {
        self.timer.cancel();
        self.pending = None;
    }

    #[must_use]
    pub const fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_fires_exactly_once() {
        let mut timer = DeadlineTimer::idle();
        timer.arm(UnixTimeMs(1_000), 500);

        assert!(!timer.fire(UnixTimeMs(1_499)));
        assert!(timer.fire(UnixTimeMs(1_500)));
        assert!(!timer.fire(UnixTimeMs(2_000)));
        assert!(!timer.is_armed());
    }

    #[test]
    fn cancel_disarms() {
        let mut timer = DeadlineTimer::idle();
        timer.arm(UnixTimeMs(0), 100);
        timer.cancel();
        assert!(!timer.fire(UnixTimeMs(10_000)));
    }

    #[test]
    fn rearming_replaces_deadline() {
        let mut timer = DeadlineTimer::idle();
        timer.arm(UnixTimeMs(0), 100);
        timer.arm(UnixTimeMs(50), 100);
        assert!(!timer.fire(UnixTimeMs(120)));
        assert!(timer.fire(UnixTimeMs(150)));
    }

    #[test]
    fn debounce_collapses_burst_to_last_value() {
        let mut debounce = Debouncer::new(100);
        for i in 0u32..50 {
            debounce.submit(i, UnixTimeMs(u64::from(i)));
        }
        // Quiet period starts at the last submission (t=49).
        assert_eq!(debounce.poll(UnixTimeMs(148)), None);
        assert_eq!(debounce.poll(UnixTimeMs(149)), Some(49));
        assert_eq!(debounce.poll(UnixTimeMs(10_000)), None);
    }

    #[test]
    fn debounce_cancel_drops_pending() {
        let mut debounce = Debouncer::new(100);
        debounce.submit(7u32, UnixTimeMs(0));
        debounce.cancel();
        assert_eq!(debounce.poll(UnixTimeMs(1_000)), None);
        assert!(!debounce.has_pending());
    }
}
