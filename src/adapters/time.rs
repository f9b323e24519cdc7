//! System clock adapter.
//!
//! Monotonic uptime from `std::time::Instant` drives every timer, so wall
//! clock steps (NTP sync, DST) never stretch or skip a duty phase.  Wall
//! time is only used for history timestamps and the business-hours check.

use core::time::Duration;
use std::time::Instant;

use chrono::{DateTime, Local, NaiveTime, Utc};

use crate::app::ports::ClockPort;

pub struct SystemClock {
    start: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl ClockPort for SystemClock {
    fn uptime(&self) -> Duration {
        self.start.elapsed()
    }

    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }

    /// Local time of day per the host's timezone.
    fn local_time_of_day(&self) -> NaiveTime {
        Local::now().time()
    }
}
