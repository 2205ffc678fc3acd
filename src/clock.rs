//! Monotonic time sources used to stamp race starts and finish times.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Monotonic time provider read by the coordinator.
///
/// Readings are durations since an arbitrary per-clock epoch; only differences
/// between two readings of the same clock are meaningful. Finish times are
/// always computed on the authority from this clock, never taken from a
/// client-reported timestamp.
pub trait ClockSource: Send + Sync {
    /// Current monotonic reading.
    fn now(&self) -> Duration;
}

/// Production clock backed by [`Instant`], anchored at construction.
#[derive(Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Create a clock whose epoch is the moment of construction.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockSource for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Hand-driven clock for deterministic tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<Duration>,
}

impl ManualClock {
    /// Create a manual clock starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Jump the clock to an absolute reading.
    pub fn set(&self, value: Duration) {
        *self.now.lock().expect("manual clock poisoned") = value;
    }

    /// Move the clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        let mut guard = self.now.lock().expect("manual clock poisoned");
        *guard += delta;
    }
}

impl ClockSource for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock().expect("manual clock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonic_clock_never_goes_backwards() {
        let clock = MonotonicClock::new();
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }

    #[test]
    fn manual_clock_advances_and_jumps() {
        let clock = ManualClock::new();
        assert_eq!(clock.now(), Duration::ZERO);

        clock.advance(Duration::from_millis(2500));
        assert_eq!(clock.now(), Duration::from_millis(2500));

        clock.set(Duration::from_secs_f64(9.8));
        assert_eq!(clock.now(), Duration::from_secs_f64(9.8));
    }
}
