//! Thread-safe handle onto the control loop.
//!
//! The control loop is the only owner of mutable state.  Everything else
//! talks to it through a [`ControlHandle`]:
//!
//! ```text
//! ┌──────────────┐  AppCommand (Channel)  ┌──────────────┐
//! │ HTTP / CLI / │──────────────────────▶│ Control Loop │
//! │ notifier     │◀──────────────────────│ (AppService) │
//! └──────────────┘ StatusSnapshot, history└──────────────┘
//!                  DepletionAlert (Signal)
//! ```
//!
//! Requests are validated on the caller's thread and queued; the loop
//! drains the queue at the start of its next tick.  Reads return the
//! snapshot published at the end of the last tick, so they never observe
//! a half-applied tick.

use std::cell::RefCell;
use std::sync::Arc;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use serde::Serialize;

use crate::config::{DutyCycleProfile, SettingsPatch};
use crate::error::RequestError;
use crate::history::HistoryEntry;
use crate::oil::DepletionAlert;

use super::commands::AppCommand;

/// Queued requests not yet picked up by the loop.
const COMMAND_DEPTH: usize = 8;

// ───────────────────────────────────────────────────────────────
// Published views
// ───────────────────────────────────────────────────────────────

/// Read-only status as of the end of the last tick.  Runtime and oil
/// figures are rounded to one decimal place.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub enabled: bool,
    pub duty_cycle: u8,
    pub duty_cycle_label: String,
    pub business_hours_enabled: bool,
    pub business_hours_start: String,
    pub business_hours_end: String,
    pub hvac_fan_state: bool,
    pub pump_on: bool,
    pub fan_on: bool,
    pub activation_state: String,
    pub pump_runtime_minutes: f64,
    pub fan_runtime_minutes: f64,
    pub oil_used_ml: f64,
    pub oil_remaining_ml: f64,
    pub oil_percentage: f64,
    pub oil_usage_rate_ml_per_hour: f64,
    pub oil_bottle_capacity_ml: f64,
}

/// One row of the intensity selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DutyCycleInfo {
    pub index: u8,
    pub on: u32,
    pub off: u32,
    pub label: String,
}

// ───────────────────────────────────────────────────────────────
// Mailbox (shared between the loop and its handles)
// ───────────────────────────────────────────────────────────────

pub(crate) struct Mailbox {
    commands: Channel<CriticalSectionRawMutex, AppCommand, COMMAND_DEPTH>,
    status: Mutex<CriticalSectionRawMutex, RefCell<StatusSnapshot>>,
    history: Mutex<CriticalSectionRawMutex, RefCell<Vec<HistoryEntry>>>,
    depletion: Signal<CriticalSectionRawMutex, DepletionAlert>,
}

impl Mailbox {
    pub(crate) fn new() -> Self {
        Self {
            commands: Channel::new(),
            status: Mutex::new(RefCell::new(StatusSnapshot::default())),
            history: Mutex::new(RefCell::new(Vec::new())),
            depletion: Signal::new(),
        }
    }

    pub(crate) fn next_command(&self) -> Option<AppCommand> {
        self.commands.try_receive().ok()
    }

    pub(crate) fn publish_status(&self, status: StatusSnapshot) {
        self.status.lock(|s| *s.borrow_mut() = status);
    }

    pub(crate) fn publish_history(&self, entries: Vec<HistoryEntry>) {
        self.history.lock(|h| *h.borrow_mut() = entries);
    }

    pub(crate) fn raise_depletion(&self, alert: DepletionAlert) {
        self.depletion.signal(alert);
    }
}

// ───────────────────────────────────────────────────────────────
// ControlHandle
// ───────────────────────────────────────────────────────────────

/// Cheap to clone; every clone talks to the same control loop.
#[derive(Clone)]
pub struct ControlHandle {
    mailbox: Arc<Mailbox>,
}

impl ControlHandle {
    pub(crate) fn new(mailbox: Arc<Mailbox>) -> Self {
        Self { mailbox }
    }

    pub fn get_status(&self) -> StatusSnapshot {
        self.mailbox.status.lock(|s| s.borrow().clone())
    }

    /// HVAC transitions over the last 24 hours, oldest first.
    pub fn get_history(&self) -> Vec<HistoryEntry> {
        self.mailbox.history.lock(|h| h.borrow().clone())
    }

    /// Validate `patch` and queue it.  An invalid patch is rejected here and
    /// never reaches the loop.
    pub fn update_settings(&self, patch: &SettingsPatch) -> Result<(), RequestError> {
        let update = patch.validate()?;
        self.send(AppCommand::UpdateSettings(update))
    }

    pub fn reset_counters(&self) -> Result<(), RequestError> {
        self.send(AppCommand::ResetCounters)
    }

    /// Take the pending depletion alert, if one was raised since the last
    /// call.  Each alert is handed out once.
    pub fn take_depletion_alert(&self) -> Option<DepletionAlert> {
        self.mailbox.depletion.try_take()
    }

    pub fn duty_cycles() -> Vec<DutyCycleInfo> {
        DutyCycleProfile::all()
            .map(|p| DutyCycleInfo {
                index: p.index(),
                on: p.on_secs(),
                off: p.off_secs(),
                label: p.label(),
            })
            .collect()
    }

    fn send(&self, cmd: AppCommand) -> Result<(), RequestError> {
        self.mailbox
            .commands
            .try_send(cmd)
            .map_err(|_| RequestError::Busy)
    }
}
