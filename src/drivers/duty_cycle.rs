//! Duty-cycle driver.
//!
//! Alternates pump and fan together between an ON and an OFF phase taken
//! from the selected [`DutyCycleProfile`].  Each phase is timed from its
//! own entry on the monotonic clock.  Deactivation cancels the phase
//! outright, so the next activation always starts a fresh ON phase.
//!
//! ```text
//!  active ───┐      ┌──────────────────────────────────────┐
//!            └──────┘                                      └───
//!  outputs   ┌────ON────┐        ┌────ON────┐        ┌──┐
//!  ──────────┘          └──OFF───┘          └──OFF───┘  └──────
//! ```

use core::time::Duration;

use log::debug;

use crate::config::DutyCycleProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DutyPhase {
    /// Not running.  Outputs off.
    Idle,
    On { since: Duration },
    Rest { since: Duration },
}

pub struct DutyCycleDriver {
    phase: DutyPhase,
}

impl DutyCycleDriver {
    pub fn new() -> Self {
        Self {
            phase: DutyPhase::Idle,
        }
    }

    /// Advance the phase timer.  Returns whether pump and fan should be on.
    pub fn tick(&mut self, active: bool, profile: DutyCycleProfile, now: Duration) -> bool {
        if !active {
            self.cancel();
            return false;
        }

        match self.phase {
            DutyPhase::Idle => {
                debug!("Duty cycle start ({})", profile.label());
                self.phase = DutyPhase::On { since: now };
                true
            }
            DutyPhase::On { since } => {
                if now.saturating_sub(since) >= profile.on_duration() {
                    self.phase = DutyPhase::Rest { since: now };
                    false
                } else {
                    true
                }
            }
            DutyPhase::Rest { since } => {
                if now.saturating_sub(since) >= profile.off_duration() {
                    self.phase = DutyPhase::On { since: now };
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Drop any in-flight phase.
    pub fn cancel(&mut self) {
        if self.phase != DutyPhase::Idle {
            debug!("Duty cycle cancelled in {:?}", self.phase);
            self.phase = DutyPhase::Idle;
        }
    }

    pub fn phase(&self) -> DutyPhase {
        self.phase
    }

    pub fn outputs_on(&self) -> bool {
        matches!(self.phase, DutyPhase::On { .. })
    }
}

impl Default for DutyCycleDriver {
    fn default() -> Self {
        Self::new()
    }
}
