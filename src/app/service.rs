//! Application service: the hexagonal core and the control loop tick.
//!
//! [`AppService`] owns every piece of mutable state: configuration, oil
//! ledger, blower debouncer, activation FSM, duty-cycle driver and HVAC
//! history.  All I/O flows through port traits injected at call sites, so
//! the whole loop runs against mocks in tests.
//!
//! ```text
//!  HvacInputPort ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                    │          AppService          │
//! DiffuserOutput ◀── │ Debounce · FSM · Duty · Oil  │ ──▶ StatePort
//!                    └──────────────────────────────┘ ──▶ HistoryLogPort
//!                          ▲ AppCommand   │ StatusSnapshot
//!                          └─ ControlHandle ◀┘
//! ```
//!
//! One call to [`AppService::tick`] is one logically atomic step.  Queued
//! requests are applied first, so a settings change never splits a tick.

use core::time::Duration;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};

use crate::config::{
    COUNTER_CHECKPOINT_INTERVAL, RuntimeCounters, SettingsUpdate, StateRecord, SystemConfig,
    TELEMETRY_INTERVAL,
};
use crate::drivers::duty_cycle::DutyCycleDriver;
use crate::fsm::context::{ActivationInputs, FsmContext};
use crate::fsm::states::build_state_table;
use crate::fsm::{ActivationState, Fsm, StateId};
use crate::history::{HistoryEntry, HistoryRecorder};
use crate::oil::{DepletionAlert, OilLedger};
use crate::schedule::{Cadence, format_time_of_day};
use crate::sensors::hvac::{HvacMonitor, HvacState};

use super::commands::AppCommand;
use super::events::AppEvent;
use super::handle::{ControlHandle, Mailbox, StatusSnapshot};
use super::ports::{
    ClockPort, DiffuserOutputPort, EventSink, HistoryLogPort, HvacInputPort, OutputChannel,
    StatePort,
};

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

pub struct AppService {
    fsm: Fsm,
    ctx: FsmContext,
    config: SystemConfig,
    ledger: OilLedger,
    hvac: HvacMonitor,
    driver: DutyCycleDriver,
    history: HistoryRecorder,
    mailbox: Arc<Mailbox>,

    /// Level last written successfully to each output; `None` before the
    /// first write.
    pump_applied: Option<bool>,
    fan_applied: Option<bool>,
    output_fault: bool,

    last_tick: Option<Duration>,

    // -- Persistence --
    /// A mutation requested an immediate save.
    persist_pending: bool,
    /// Runtime accrued (or a save failed) since the last successful save.
    counters_dirty: bool,
    checkpoint: Cadence,

    telemetry: Cadence,
    history_changed: bool,
}

impl AppService {
    /// Construct the service from persisted state.
    ///
    /// Does **not** start the FSM; call [`start`](Self::start) next.
    pub fn new(record: StateRecord, history: Vec<HistoryEntry>, wall_now: DateTime<Utc>) -> Self {
        let StateRecord { config, counters } = record;
        let ledger = OilLedger::new(counters, &config);
        let history = HistoryRecorder::from_entries(history, wall_now);

        Self {
            fsm: Fsm::new(build_state_table(), StateId::Idle),
            ctx: FsmContext::new(),
            config,
            ledger,
            hvac: HvacMonitor::new(wall_now),
            driver: DutyCycleDriver::new(),
            history,
            mailbox: Arc::new(Mailbox::new()),
            pump_applied: None,
            fan_applied: None,
            output_fault: false,
            last_tick: None,
            persist_pending: false,
            counters_dirty: false,
            checkpoint: Cadence::new(COUNTER_CHECKPOINT_INTERVAL),
            telemetry: Cadence::new(TELEMETRY_INTERVAL),
            history_changed: true,
        }
    }

    /// A new handle onto this service's mailbox and published snapshots.
    pub fn handle(&self) -> ControlHandle {
        ControlHandle::new(self.mailbox.clone())
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, sink: &mut impl EventSink) {
        self.fsm.start(&mut self.ctx);
        self.publish();
        sink.emit(&AppEvent::Started(self.fsm.current_state()));
        info!(
            "AppService started in {}: enabled={}, duty {}, oil {:.1}%",
            self.fsm.current_state(),
            self.config.enabled,
            self.config.duty_cycle.label(),
            self.ledger.percentage()
        );
    }

    /// Run one control cycle.
    ///
    /// 1. Apply queued requests.
    /// 2. Accrue runtime for the interval that just ended.
    /// 3. Poll the blower (on its own cadence); record transitions.
    /// 4. Prune history.
    /// 5. Update the oil ledger; auto-disable on depletion.
    /// 6. Advance the activation FSM.
    /// 7. Advance the duty-cycle driver and drive the outputs.
    /// 8. Persist if a mutation or checkpoint calls for it.
    /// 9. Publish status and history.
    ///
    /// `hw` satisfies **both** hardware ports and `store` **both** storage
    /// ports, which keeps the borrows simple and the boundary explicit.
    pub fn tick(
        &mut self,
        hw: &mut (impl HvacInputPort + DiffuserOutputPort),
        clock: &impl ClockPort,
        store: &mut (impl StatePort + HistoryLogPort),
        sink: &mut impl EventSink,
    ) {
        let now = clock.uptime();
        let wall = clock.now_utc();
        if self.last_tick.is_none() {
            self.checkpoint.reset(now);
        }

        // 1. Requests
        while let Some(cmd) = self.mailbox.next_command() {
            self.handle_command(cmd, sink);
        }

        // 2. Runtime
        self.accrue_runtime(now);

        // 3. Blower
        if let Some(state) = self.hvac.poll(hw, now, wall) {
            self.record_transition(state, store);
            sink.emit(&AppEvent::HvacChanged(state));
        }

        // 4. History retention
        if self.history.prune(wall) > 0 {
            self.compact_history(store);
        }

        // 5. Oil
        if let Some(alert) = self.ledger.update(wall) {
            self.on_depleted(alert, sink);
        }

        // 6. Activation policy
        self.ctx.now = now;
        self.ctx.inputs = ActivationInputs {
            hvac_running: self.hvac.is_running(),
            enabled: self.config.enabled,
            within_business_hours: self
                .config
                .business_hours()
                .is_none_or(|bh| bh.contains(clock.local_time_of_day())),
            oil_depleted: self.ledger.is_depleted(),
        };
        let prev = self.fsm.current_state();
        if let Some(next) = self.fsm.tick(&mut self.ctx) {
            sink.emit(&AppEvent::StateChanged {
                from: prev,
                to: next,
            });
        }

        // 7. Duty cycle and outputs
        let on = self
            .driver
            .tick(self.ctx.run_diffuser, self.config.duty_cycle, now);
        self.apply_outputs(hw, on, sink);

        // 8. Persistence
        self.persist_if_needed(now, store);

        // 9. Publish
        self.publish();
        if self.telemetry.due(now) {
            sink.emit(&AppEvent::Telemetry(self.status()));
        }
    }

    /// Orderly stop: outputs off, driver cancelled, state and history
    /// flushed.  Safe to call more than once.
    pub fn shutdown(
        &mut self,
        hw: &mut impl DiffuserOutputPort,
        store: &mut (impl StatePort + HistoryLogPort),
    ) {
        self.driver.cancel();
        self.ctx.run_diffuser = false;
        hw.all_off();
        self.pump_applied = Some(false);
        self.fan_applied = Some(false);

        match store.save(&self.record()) {
            Ok(()) => {
                self.persist_pending = false;
                self.counters_dirty = false;
                info!("State flushed on shutdown");
            }
            Err(e) => warn!("State flush on shutdown failed: {e}"),
        }
        self.compact_history(store);
        self.publish();
        info!("Control loop stopped, outputs off");
    }

    // ── Command handling ──────────────────────────────────────

    fn handle_command(&mut self, cmd: AppCommand, sink: &mut impl EventSink) {
        match cmd {
            AppCommand::UpdateSettings(update) => self.apply_settings(&update, sink),
            AppCommand::ResetCounters => {
                self.ledger.reset();
                self.counters_dirty = true;
                self.persist_pending = true;
                sink.emit(&AppEvent::CountersReset);
            }
        }
    }

    fn apply_settings(&mut self, update: &SettingsUpdate, sink: &mut impl EventSink) {
        let mut next = self.config.clone();
        update.apply_to(&mut next);
        if let Err(e) = next.validate() {
            // Unreachable for updates built by `SettingsPatch::validate`.
            warn!("Settings rejected: {e}");
            return;
        }

        self.ledger.set_usage_rate(next.oil_usage_rate_ml_per_hour);
        self.ledger.set_capacity(next.oil_bottle_capacity_ml);
        if next.enabled && !self.config.enabled && self.ledger.is_depleted() {
            warn!("System enabled with an empty bottle; reset counters after refilling");
        }
        self.config = next;
        self.persist_pending = true;
        info!(
            "Settings applied: enabled={}, duty {}, business hours {}",
            self.config.enabled,
            self.config.duty_cycle.label(),
            match self.config.business_hours() {
                Some(bh) => format!(
                    "{}-{}",
                    format_time_of_day(bh.start),
                    format_time_of_day(bh.end)
                ),
                None => "off".to_owned(),
            }
        );
        sink.emit(&AppEvent::SettingsApplied(self.config.clone()));
    }

    // ── Internal ──────────────────────────────────────────────

    fn accrue_runtime(&mut self, now: Duration) {
        let dt = self
            .last_tick
            .map_or(Duration::ZERO, |last| now.saturating_sub(last));
        self.last_tick = Some(now);
        if dt.is_zero() {
            return;
        }

        let secs = dt.as_secs_f64();
        let pump = if self.pump_applied == Some(true) { secs } else { 0.0 };
        let fan = if self.fan_applied == Some(true) { secs } else { 0.0 };
        if pump > 0.0 || fan > 0.0 {
            self.ledger.add_runtime(pump, fan);
            self.counters_dirty = true;
        }
    }

    fn record_transition(&mut self, state: HvacState, store: &mut impl HistoryLogPort) {
        let pruned = self.history.record(state.since, state.is_running);
        self.history_changed = true;
        let entry = HistoryEntry {
            timestamp: state.since,
            hvac_running: state.is_running,
        };
        if let Err(e) = store.append(&entry) {
            warn!("History append failed: {e}");
        }
        if pruned > 0 {
            self.compact_history(store);
        }
    }

    fn compact_history(&mut self, store: &mut impl HistoryLogPort) {
        self.history_changed = true;
        if let Err(e) = store.compact(&self.history.snapshot()) {
            warn!("History compaction failed: {e}");
        }
    }

    fn on_depleted(&mut self, alert: DepletionAlert, sink: &mut impl EventSink) {
        if self.config.enabled {
            self.config.enabled = false;
            error!("Oil depleted: system auto-disabled");
        }
        self.persist_pending = true;
        self.mailbox.raise_depletion(alert);
        sink.emit(&AppEvent::OilDepleted(alert));
    }

    /// Drive both outputs to `on`.  Only writes on change (and on the very
    /// first tick, to assert a known level).  A failed write keeps the
    /// previous level and is retried next tick.
    fn apply_outputs(
        &mut self,
        hw: &mut impl DiffuserOutputPort,
        on: bool,
        sink: &mut impl EventSink,
    ) {
        let mut switched = false;
        let mut failed = false;
        for (channel, applied) in [
            (OutputChannel::Pump, &mut self.pump_applied),
            (OutputChannel::Fan, &mut self.fan_applied),
        ] {
            if *applied == Some(on) {
                continue;
            }
            match hw.set_output(channel, on) {
                Ok(()) => {
                    *applied = Some(on);
                    switched = true;
                }
                Err(e) => {
                    failed = true;
                    if !self.output_fault {
                        warn!("{e}; holding previous output state");
                    }
                }
            }
        }

        if failed {
            self.output_fault = true;
        } else if self.output_fault {
            self.output_fault = false;
            info!("Output writes recovered");
        }

        if switched && self.pump_applied == Some(on) && self.fan_applied == Some(on) {
            debug!("Outputs {}", if on { "ON" } else { "OFF" });
            sink.emit(&AppEvent::OutputsChanged { on });
        }
    }

    /// At most one state write per tick.
    fn persist_if_needed(&mut self, now: Duration, store: &mut impl StatePort) {
        let due = self.persist_pending || (self.counters_dirty && self.checkpoint.due(now));
        if !due {
            return;
        }
        self.persist_pending = false;

        match store.save(&self.record()) {
            Ok(()) => {
                self.counters_dirty = false;
                self.checkpoint.reset(now);
                debug!("State saved");
            }
            Err(e) => {
                // Retried on the next mutation or checkpoint.
                self.counters_dirty = true;
                warn!("State save failed: {e}");
            }
        }
    }

    fn publish(&mut self) {
        self.mailbox.publish_status(self.status());
        if self.history_changed {
            self.history_changed = false;
            self.mailbox.publish_history(self.history.snapshot());
        }
    }

    fn record(&self) -> StateRecord {
        StateRecord {
            config: self.config.clone(),
            counters: self.ledger.counters(),
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn status(&self) -> StatusSnapshot {
        let counters = self.ledger.counters();
        StatusSnapshot {
            enabled: self.config.enabled,
            duty_cycle: self.config.duty_cycle.index(),
            duty_cycle_label: self.config.duty_cycle.label(),
            business_hours_enabled: self.config.business_hours_enabled,
            business_hours_start: format_time_of_day(self.config.business_hours_start),
            business_hours_end: format_time_of_day(self.config.business_hours_end),
            hvac_fan_state: self.hvac.is_running(),
            pump_on: self.pump_applied == Some(true),
            fan_on: self.fan_applied == Some(true),
            activation_state: self.fsm.current_state().as_str().to_owned(),
            pump_runtime_minutes: round1(counters.pump_runtime_seconds / 60.0),
            fan_runtime_minutes: round1(counters.fan_runtime_seconds / 60.0),
            oil_used_ml: round1(counters.oil_consumed_ml),
            oil_remaining_ml: round1(self.ledger.remaining_ml()),
            oil_percentage: round1(self.ledger.percentage()),
            oil_usage_rate_ml_per_hour: self.config.oil_usage_rate_ml_per_hour,
            oil_bottle_capacity_ml: self.config.oil_bottle_capacity_ml,
        }
    }

    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    pub fn activation_state(&self) -> ActivationState {
        match self.fsm.current_state() {
            StateId::Idle => ActivationState::Idle,
            StateId::Pending => ActivationState::Pending {
                since: self.ctx.pending_since.unwrap_or(self.ctx.now),
            },
            StateId::Active => ActivationState::Active,
            StateId::SuppressedDepleted => ActivationState::SuppressedDepleted,
        }
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    /// Unrounded counters.
    pub fn counters(&self) -> RuntimeCounters {
        self.ledger.counters()
    }

    /// Retained HVAC transitions, oldest first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.history.snapshot()
    }

    pub fn oil_remaining_ml(&self) -> f64 {
        self.ledger.remaining_ml()
    }

    pub fn oil_percentage(&self) -> f64 {
        self.ledger.percentage()
    }

    pub fn outputs_on(&self) -> bool {
        self.pump_applied == Some(true) && self.fan_applied == Some(true)
    }

    /// Whether state has changed since the last successful save.
    pub fn is_dirty(&self) -> bool {
        self.persist_pending || self.counters_dirty
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}
