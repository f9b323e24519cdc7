//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing one structured line per
//! [`AppEvent`] through the `log` facade.  This is also where the
//! depletion alert surfaces for an operator; a push-notification adapter
//! would implement the same trait.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::schedule::format_time_of_day;

pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

fn on_off(v: bool) -> &'static str {
    if v { "ON" } else { "OFF" }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(t) => {
                info!(
                    "TELEM | state={} | hvac={} | out={} | oil={:.1}% ({:.1} mL left) | \
                     pump={:.1}min fan={:.1}min | duty={}",
                    t.activation_state,
                    on_off(t.hvac_fan_state),
                    on_off(t.pump_on && t.fan_on),
                    t.oil_percentage,
                    t.oil_remaining_ml,
                    t.pump_runtime_minutes,
                    t.fan_runtime_minutes,
                    t.duty_cycle_label,
                );
            }
            AppEvent::StateChanged { from, to } => {
                info!("STATE | {from} -> {to}");
            }
            AppEvent::HvacChanged(s) => {
                info!(
                    "HVAC | blower {} at {}",
                    on_off(s.is_running),
                    s.since.format("%Y-%m-%d %H:%M:%S")
                );
            }
            AppEvent::OutputsChanged { on } => {
                info!("OUTPUT | pump+fan {}", on_off(*on));
            }
            AppEvent::SettingsApplied(c) => {
                info!(
                    "CONFIG | enabled={} duty={} hours={}({}-{}) rate={}mL/h bottle={}mL",
                    c.enabled,
                    c.duty_cycle.label(),
                    c.business_hours_enabled,
                    format_time_of_day(c.business_hours_start),
                    format_time_of_day(c.business_hours_end),
                    c.oil_usage_rate_ml_per_hour,
                    c.oil_bottle_capacity_ml,
                );
            }
            AppEvent::CountersReset => {
                info!("OIL | counters reset, bottle full");
            }
            AppEvent::OilDepleted(alert) => {
                warn!(
                    "OIL | depleted at {} ({:.1} of {:.1} mL used), diffuser disabled",
                    alert.at.format("%Y-%m-%d %H:%M:%S"),
                    alert.oil_consumed_ml,
                    alert.oil_bottle_capacity_ml,
                );
            }
            AppEvent::Started(state) => {
                info!("START | initial_state={state}");
            }
        }
    }
}
