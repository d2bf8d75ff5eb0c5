//! Time source for target-date computation.

use chrono::{DateTime, Local, TimeZone};

/// Provides "now" in the zone that day boundaries are computed in.
pub trait Clock {
    type Tz: TimeZone;

    fn now(&self) -> DateTime<Self::Tz>;
}

/// Wall clock in the machine's local zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    type Tz = Local;

    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Clock frozen at one instant.
#[derive(Debug, Clone)]
pub struct FixedClock<Tz: TimeZone> {
    now: DateTime<Tz>,
}

impl<Tz: TimeZone> FixedClock<Tz> {
    #[must_use]
    pub fn new(now: DateTime<Tz>) -> Self {
        Self { now }
    }

    /// Move the clock to another instant.
    pub fn set(&mut self, now: DateTime<Tz>) {
        self.now = now;
    }
}

impl<Tz: TimeZone> Clock for FixedClock<Tz> {
    type Tz = Tz;

    fn now(&self) -> DateTime<Tz> {
        self.now.clone()
    }
}
