//! Injected time source
//!
//! Every component that reads "now" does so through [`Clock`] so that the
//! dispatcher, the timeout scan, and the shift windows stay deterministic
//! under test.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

/// Monotonic source of the current instant
///
/// Production code uses [`SystemClock`]; tests drive a [`SimulatedClock`]
/// forward by hand to exercise shift boundaries and poll timeouts without
/// sleeping.
pub trait Clock: Send + Sync {
    /// The current instant in UTC
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock implementation backed by `chrono::Utc::now`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock for tests
///
/// ```
/// use chatdesk_engine::clock::{Clock, SimulatedClock};
/// use chrono::{Duration, TimeZone, Utc};
///
/// let clock = SimulatedClock::new(Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap());
/// clock.advance(Duration::seconds(3));
/// assert_eq!(clock.now().timestamp(), 1748865603);
/// ```
#[derive(Debug)]
pub struct SimulatedClock {
    now: Mutex<DateTime<Utc>>,
}

impl SimulatedClock {
    /// Create a clock frozen at the given instant
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(start) }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().expect("clock lock poisoned");
        *now = *now + by;
    }

    /// Jump the clock to an absolute instant
    pub fn set(&self, to: DateTime<Utc>) {
        let mut now = self.now.lock().expect("clock lock poisoned");
        *now = to;
    }
}

impl Clock for SimulatedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock lock poisoned")
    }
}
