//! Millisecond timebase for combat timers.
//!
//! Every combat timer (attack cooldowns, immunity windows, death
//! latency) compares millisecond timestamps read from a [`Clock`].
//! Production code uses [`MonotonicClock`]; tests drive a
//! [`ManualClock`] to land on exact tick boundaries.

use std::cell::Cell;
use std::time::Instant;

/// Milliseconds since an arbitrary epoch.
pub type Millis = u64;

/// Source of the current time in milliseconds.
pub trait Clock {
    /// Returns the current time in milliseconds.
    ///
    /// Successive reads must be non-decreasing. The epoch is
    /// arbitrary; only differences between reads are meaningful.
    fn now_ms(&self) -> Millis;
}

/// Wall-clock time measured from process start.
#[derive(Debug)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    /// Creates a clock whose epoch is the moment of construction.
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> Millis {
        self.epoch.elapsed().as_millis() as Millis
    }
}

/// Hand-driven clock for deterministic tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Millis>,
}

impl ManualClock {
    /// Creates a clock at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a clock starting at the given time.
    #[must_use]
    pub fn at(start: Millis) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    /// Jumps to an absolute time.
    pub fn set(&self, now: Millis) {
        self.now.set(now);
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Millis) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> Millis {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::new();
        assert_eq!(clock.now_ms(), 0);

        clock.advance(16);
        assert_eq!(clock.now_ms(), 16);

        clock.set(1000);
        assert_eq!(clock.now_ms(), 1000);
    }

    #[test]
    fn test_manual_clock_at() {
        let clock = ManualClock::at(500);
        assert_eq!(clock.now_ms(), 500);
    }

    #[test]
    fn test_monotonic_clock_non_decreasing() {
        let clock = MonotonicClock::new();
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(b >= a);
    }
}
