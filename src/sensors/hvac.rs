//! Blower sense debouncer.
//!
//! The air handler relay does not chatter on a seconds timescale, so the
//! line is simply sampled every [`HVAC_POLL_INTERVAL`] and the raw level is
//! taken as the debounced state.  A failed read holds the
//! previous state for that poll and is retried on the next one.
//!
//! [`HVAC_POLL_INTERVAL`]: crate::config::HVAC_POLL_INTERVAL

use core::time::Duration;

use chrono::{DateTime, Utc};
use log::{info, warn};

use crate::app::ports::HvacInputPort;
use crate::config::HVAC_POLL_INTERVAL;
use crate::schedule::Cadence;

/// Consecutive failures between repeated warnings (one minute at 5 s).
const FAILURE_LOG_EVERY: u32 = 12;

/// Debounced blower state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HvacState {
    pub is_running: bool,
    /// Wall-clock time of the last transition (or of startup).
    pub since: DateTime<Utc>,
}

pub struct HvacMonitor {
    cadence: Cadence,
    state: HvacState,
    consecutive_failures: u32,
}

impl HvacMonitor {
    /// Starts out assuming the blower is off.
    pub fn new(started: DateTime<Utc>) -> Self {
        Self {
            cadence: Cadence::new(HVAC_POLL_INTERVAL),
            state: HvacState {
                is_running: false,
                since: started,
            },
            consecutive_failures: 0,
        }
    }

    /// Sample the line if a poll is due.  Returns the new state only when
    /// it differs from the previous one.
    pub fn poll(
        &mut self,
        input: &mut impl HvacInputPort,
        now: Duration,
        wall: DateTime<Utc>,
    ) -> Option<HvacState> {
        if !self.cadence.due(now) {
            return None;
        }

        match input.sample_hvac() {
            Ok(running) => {
                if self.consecutive_failures > 0 {
                    info!(
                        "HVAC sense recovered after {} failed polls",
                        self.consecutive_failures
                    );
                    self.consecutive_failures = 0;
                }
                self.observe(running, wall)
            }
            Err(e) => {
                if self.consecutive_failures % FAILURE_LOG_EVERY == 0 {
                    warn!(
                        "HVAC sense: {e}; holding {} (failure #{})",
                        if self.state.is_running { "ON" } else { "OFF" },
                        self.consecutive_failures + 1
                    );
                }
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                None
            }
        }
    }

    /// Feed a sampled level.  Edge-triggered: returns `Some` on change.
    pub fn observe(&mut self, running: bool, wall: DateTime<Utc>) -> Option<HvacState> {
        if running == self.state.is_running {
            return None;
        }
        self.state = HvacState {
            is_running: running,
            since: wall,
        };
        info!("HVAC blower {}", if running { "ON" } else { "OFF" });
        Some(self.state)
    }

    pub fn state(&self) -> HvacState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}
