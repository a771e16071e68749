//! Time source injected into the token codec, the stores and the auth core.
//!
//! Everything that compares against "now" goes through [`Clock`] so tests can
//! pin and advance time instead of sleeping.

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Real system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests and replay tooling.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Start at the current system time, truncated to whole seconds so values
    /// survive a round-trip through epoch-second storage unchanged.
    pub fn starting_now() -> Self {
        Self::new(from_epoch_secs(Utc::now().timestamp()))
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.lock() = instant;
    }

    pub fn advance(&self, by: TimeDelta) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Convert stored epoch seconds back into a UTC timestamp.
///
/// Out-of-range values collapse to the Unix epoch rather than failing the read.
pub fn from_epoch_secs(secs: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(from_epoch_secs(1_700_000_000));
        clock.advance(TimeDelta::minutes(5));
        assert_eq!(clock.now().timestamp(), 1_700_000_300);

        clock.set(from_epoch_secs(42));
        assert_eq!(clock.now().timestamp(), 42);
    }

    #[test]
    fn starting_now_has_no_subsecond_part() {
        let clock = ManualClock::starting_now();
        assert_eq!(clock.now().timestamp_subsec_nanos(), 0);
    }

    #[test]
    fn epoch_conversion_round_trips_whole_seconds() {
        let ts = from_epoch_secs(1_234_567_890);
        assert_eq!(ts.timestamp(), 1_234_567_890);
    }
}
