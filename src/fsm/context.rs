//! Shared mutable context threaded through every activation handler.
//!
//! The control loop writes [`ActivationInputs`] before each tick; handlers
//! read them and write back `run_diffuser`, the single command this state
//! machine produces.

use core::time::Duration;

use crate::config::ACTIVATION_DELAY;

// ---------------------------------------------------------------------------
// Inputs (written by the control loop before every FSM tick)
// ---------------------------------------------------------------------------

/// Everything the activation decision depends on, sampled once per tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivationInputs {
    /// Debounced blower state.
    pub hvac_running: bool,
    /// Master enable from `SystemConfig`.
    pub enabled: bool,
    /// `true` when business hours are disabled or the current local time
    /// is inside the window.
    pub within_business_hours: bool,
    /// Remaining oil is zero.
    pub oil_depleted: bool,
}

// ---------------------------------------------------------------------------
// FsmContext
// ---------------------------------------------------------------------------

pub struct FsmContext {
    // -- Timing --
    /// Monotonic uptime at the current tick.
    pub now: Duration,
    /// How long the blower must run before the diffuser starts.
    pub activation_delay: Duration,
    /// When the current blower run was first seen.  Survives a hop from
    /// `Active` back to `Pending` so the delay is not served twice.
    pub pending_since: Option<Duration>,

    // -- Inputs --
    pub inputs: ActivationInputs,

    // -- Output --
    /// Whether the duty-cycle driver should be running.
    pub run_diffuser: bool,

    // -- Log suppression --
    /// Set once the "delay elapsed but outside business hours" notice has
    /// been logged for the current pending period.
    pub blocked_by_hours: bool,
}

impl FsmContext {
    pub fn new() -> Self {
        Self::with_delay(ACTIVATION_DELAY)
    }

    pub fn with_delay(activation_delay: Duration) -> Self {
        Self {
            now: Duration::ZERO,
            activation_delay,
            pending_since: None,
            inputs: ActivationInputs::default(),
            run_diffuser: false,
            blocked_by_hours: false,
        }
    }

    /// Time since the blower run started, zero if none is pending.
    pub fn pending_elapsed(&self) -> Duration {
        self.pending_since
            .map_or(Duration::ZERO, |since| self.now.saturating_sub(since))
    }

    pub fn delay_elapsed(&self) -> bool {
        self.pending_since.is_some() && self.pending_elapsed() >= self.activation_delay
    }
}

impl Default for FsmContext {
    fn default() -> Self {
        Self::new()
    }
}
