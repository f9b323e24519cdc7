//! Oil ledger.
//!
//! Converts pump runtime into consumed oil and raises a one-shot depletion
//! alert when the remaining volume crosses zero.
//!
//! ## Depletion lifecycle
//!
//! 1. Pump runtime accrues; `oil_consumed_ml` grows with it.
//! 2. On the tick where remaining volume goes from `> 0` to `<= 0`,
//!    [`OilLedger::update`] returns a [`DepletionAlert`] and latches.
//! 3. Further ticks at zero return nothing.
//! 4. The episode ends when remaining volume is positive again, either via
//!    [`OilLedger::reset`] (bottle replaced) or a larger capacity setting.
//!
//! Consumption is never clamped.  A usage-rate change rebases the ledger so
//! the new rate only applies to runtime accrued after the change.

use chrono::{DateTime, Utc};
use log::{error, info};

use crate::config::{RuntimeCounters, SystemConfig};

/// Raised once per depletion episode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepletionAlert {
    pub at: DateTime<Utc>,
    pub oil_consumed_ml: f64,
    pub oil_bottle_capacity_ml: f64,
}

pub struct OilLedger {
    counters: RuntimeCounters,
    usage_rate_ml_per_hour: f64,
    capacity_ml: f64,
    /// Pump runtime and consumption at the last rate change.
    epoch_runtime_secs: f64,
    epoch_consumed_ml: f64,
    /// Remaining volume seen by the previous `update`.
    last_remaining_ml: f64,
    depletion_fired: bool,
}

impl OilLedger {
    /// Resume from persisted counters.  A ledger that is already empty
    /// counts as having fired, so a restart does not re-alert.
    pub fn new(counters: RuntimeCounters, config: &SystemConfig) -> Self {
        let mut ledger = Self {
            counters,
            usage_rate_ml_per_hour: config.oil_usage_rate_ml_per_hour,
            capacity_ml: config.oil_bottle_capacity_ml,
            epoch_runtime_secs: counters.pump_runtime_seconds,
            epoch_consumed_ml: counters.oil_consumed_ml,
            last_remaining_ml: 0.0,
            depletion_fired: false,
        };
        ledger.last_remaining_ml = ledger.remaining_ml();
        ledger.depletion_fired = ledger.is_depleted();
        ledger
    }

    /// Accrue actuator ON time.
    pub fn add_runtime(&mut self, pump_secs: f64, fan_secs: f64) {
        if pump_secs > 0.0 {
            self.counters.pump_runtime_seconds += pump_secs;
            let since_epoch = self.counters.pump_runtime_seconds - self.epoch_runtime_secs;
            let consumed =
                self.epoch_consumed_ml + since_epoch / 3600.0 * self.usage_rate_ml_per_hour;
            // Guard float noise against the monotonic contract.
            self.counters.oil_consumed_ml = consumed.max(self.counters.oil_consumed_ml);
        }
        if fan_secs > 0.0 {
            self.counters.fan_runtime_seconds += fan_secs;
        }
    }

    pub fn set_usage_rate(&mut self, ml_per_hour: f64) {
        if (ml_per_hour - self.usage_rate_ml_per_hour).abs() < f64::EPSILON {
            return;
        }
        self.epoch_runtime_secs = self.counters.pump_runtime_seconds;
        self.epoch_consumed_ml = self.counters.oil_consumed_ml;
        self.usage_rate_ml_per_hour = ml_per_hour;
        info!("Oil usage rate set to {ml_per_hour} mL/h");
    }

    pub fn set_capacity(&mut self, ml: f64) {
        self.capacity_ml = ml;
    }

    /// Zero all counters atomically and clear the depletion latch.
    pub fn reset(&mut self) {
        self.counters = RuntimeCounters::default();
        self.epoch_runtime_secs = 0.0;
        self.epoch_consumed_ml = 0.0;
        self.depletion_fired = false;
        self.last_remaining_ml = self.remaining_ml();
        info!("Runtime counters reset, oil at {:.1} mL", self.capacity_ml);
    }

    /// Compare against the previous tick.  Returns an alert only on the
    /// tick where remaining oil crosses zero.
    pub fn update(&mut self, now: DateTime<Utc>) -> Option<DepletionAlert> {
        let prev = self.last_remaining_ml;
        let cur = self.remaining_ml();
        self.last_remaining_ml = cur;

        if cur > 0.0 {
            self.depletion_fired = false;
            return None;
        }
        if prev > 0.0 && !self.depletion_fired {
            self.depletion_fired = true;
            error!(
                "OIL DEPLETED: {:.1} mL consumed of {:.1} mL bottle",
                self.counters.oil_consumed_ml, self.capacity_ml
            );
            return Some(DepletionAlert {
                at: now,
                oil_consumed_ml: self.counters.oil_consumed_ml,
                oil_bottle_capacity_ml: self.capacity_ml,
            });
        }
        None
    }

    pub fn counters(&self) -> RuntimeCounters {
        self.counters
    }

    pub fn consumed_ml(&self) -> f64 {
        self.counters.oil_consumed_ml
    }

    pub fn remaining_ml(&self) -> f64 {
        (self.capacity_ml - self.counters.oil_consumed_ml).max(0.0)
    }

    /// Remaining oil as a percentage, clamped to `0..=100`.
    pub fn percentage(&self) -> f64 {
        if self.capacity_ml <= 0.0 {
            return 0.0;
        }
        (self.remaining_ml() / self.capacity_ml * 100.0).clamp(0.0, 100.0)
    }

    pub fn is_depleted(&self) -> bool {
        self.remaining_ml() <= 0.0
    }

    pub fn depletion_fired(&self) -> bool {
        self.depletion_fired
    }
}
