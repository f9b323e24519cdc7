//! Time-of-day gating and fixed-interval sub-timers.
//!
//! ```text
//!   00:00 ────────────────────────────────────────────── 24:00
//!   start <= end   │      [start ████████ end]          │
//!   start >  end   │██ end]                  [start █████│
//! ```
//!
//! [`BusinessHours`] answers "may the diffuser run right now?" for a
//! wall-clock time of day.  [`Cadence`] lets the 1 Hz control loop run
//! slower jobs (blower sampling, checkpoints, telemetry) on their own
//! period without extra threads.

use core::time::Duration;

use chrono::{NaiveTime, Timelike};

// ═══════════════════════════════════════════════════════════════
//  Business hours
// ═══════════════════════════════════════════════════════════════

/// Daily window during which activation is allowed.  Both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl BusinessHours {
    pub fn contains(&self, t: NaiveTime) -> bool {
        if self.start <= self.end {
            // e.g. 09:00..17:00
            t >= self.start && t <= self.end
        } else {
            // e.g. 22:00..06:00, wraps past midnight
            t >= self.start || t <= self.end
        }
    }
}

/// Parse `"HH:MM"` (or `"HH:MM:SS"`) into a time of day.
pub fn parse_time_of_day(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .ok()
}

/// Inverse of [`parse_time_of_day`]: `"HH:MM"`, with `":SS"` appended only
/// when the seconds are non-zero.
pub fn format_time_of_day(t: NaiveTime) -> String {
    if t.second() == 0 {
        t.format("%H:%M").to_string()
    } else {
        t.format("%H:%M:%S").to_string()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Cadence
// ═══════════════════════════════════════════════════════════════

/// Fixed-interval trigger driven by monotonic uptime.
///
/// Fires on the first call, then whenever `interval` has elapsed since the
/// last firing.
#[derive(Debug, Clone, Copy)]
pub struct Cadence {
    interval: Duration,
    last: Option<Duration>,
}

impl Cadence {
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    pub fn due(&mut self, now: Duration) -> bool {
        match self.last {
            Some(last) if now.saturating_sub(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }

    /// Restart the interval from `now` without firing.
    pub fn reset(&mut self, now: Duration) {
        self.last = Some(now);
    }
}
