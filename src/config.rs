//! System configuration parameters
//!
//! Operator-tunable settings, the persisted runtime counters, and the fixed
//! duty-cycle profile table.  `SystemConfig` is owned by the control loop and
//! is only ever changed through a validated [`SettingsUpdate`].

use core::time::Duration;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::schedule::{BusinessHours, parse_time_of_day};

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// Control loop period.  Every sub-timer is a multiple of this.
pub const CONTROL_PERIOD: Duration = Duration::from_secs(1);
/// Blower sense sampling cadence.
pub const HVAC_POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Blower must stay on this long before the diffuser starts.
pub const ACTIVATION_DELAY: Duration = Duration::from_secs(10);
/// Accumulated runtime is checkpointed to disk at most this often.
pub const COUNTER_CHECKPOINT_INTERVAL: Duration = Duration::from_secs(60);
/// Telemetry line cadence.
pub const TELEMETRY_INTERVAL: Duration = Duration::from_secs(60);
/// HVAC history retention.
pub const HISTORY_WINDOW_HOURS: i64 = 24;

// ---------------------------------------------------------------------------
// Duty-cycle profiles
// ---------------------------------------------------------------------------

/// `(on_seconds, off_seconds)` per intensity level, lightest first.
const PROFILES: [(u32, u32); DutyCycleProfile::COUNT] = [
    (60, 240),
    (60, 120),
    (60, 90),
    (60, 60),
    (60, 45),
    (60, 30),
    (90, 30),
    (120, 30),
    (240, 30),
    (360, 30),
];

/// One entry of the fixed profile table.  Construction is checked, so a
/// value of this type always refers to a real profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct DutyCycleProfile(u8);

impl DutyCycleProfile {
    pub const COUNT: usize = 10;

    pub fn from_index(index: u8) -> Result<Self, ValidationError> {
        if (index as usize) < Self::COUNT {
            Ok(Self(index))
        } else {
            Err(ValidationError::DutyCycleIndex(index))
        }
    }

    pub fn all() -> impl Iterator<Item = Self> {
        (0..Self::COUNT as u8).map(Self)
    }

    pub fn index(self) -> u8 {
        self.0
    }

    pub fn on_secs(self) -> u32 {
        PROFILES[self.0 as usize].0
    }

    pub fn off_secs(self) -> u32 {
        PROFILES[self.0 as usize].1
    }

    pub fn on_duration(self) -> Duration {
        Duration::from_secs(u64::from(self.on_secs()))
    }

    pub fn off_duration(self) -> Duration {
        Duration::from_secs(u64::from(self.off_secs()))
    }

    /// Human label, e.g. `"60s / 240s"`.
    pub fn label(self) -> String {
        format!("{}s / {}s", self.on_secs(), self.off_secs())
    }
}

impl Default for DutyCycleProfile {
    fn default() -> Self {
        Self(1) // 60 s on / 120 s off
    }
}

impl TryFrom<u8> for DutyCycleProfile {
    type Error = ValidationError;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Self::from_index(index)
    }
}

impl From<DutyCycleProfile> for u8 {
    fn from(profile: DutyCycleProfile) -> Self {
        profile.0
    }
}

// ---------------------------------------------------------------------------
// SystemConfig
// ---------------------------------------------------------------------------

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Master switch.  Cleared automatically when the oil runs out.
    pub enabled: bool,
    /// Intensity profile.
    #[serde(rename = "duty_cycle_index")]
    pub duty_cycle: DutyCycleProfile,

    // --- Business hours ---
    pub business_hours_enabled: bool,
    #[serde(with = "hhmm")]
    pub business_hours_start: NaiveTime,
    #[serde(with = "hhmm")]
    pub business_hours_end: NaiveTime,

    // --- Oil ---
    /// Oil drawn per hour of pump runtime.
    pub oil_usage_rate_ml_per_hour: f64,
    /// Volume of a full bottle.
    pub oil_bottle_capacity_ml: f64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            duty_cycle: DutyCycleProfile::default(),
            business_hours_enabled: false,
            business_hours_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            business_hours_end: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN),
            oil_usage_rate_ml_per_hour: 10.0,
            oil_bottle_capacity_ml: 500.0,
        }
    }
}

impl SystemConfig {
    /// The gating window, or `None` when business hours are switched off.
    pub fn business_hours(&self) -> Option<BusinessHours> {
        self.business_hours_enabled.then_some(BusinessHours {
            start: self.business_hours_start,
            end: self.business_hours_end,
        })
    }

    /// Range-check the numeric fields.  The profile and times are valid by
    /// construction.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_positive("oil_usage_rate_ml_per_hour", self.oil_usage_rate_ml_per_hour)?;
        check_positive("oil_bottle_capacity_ml", self.oil_bottle_capacity_ml)?;
        Ok(())
    }
}

fn check_positive(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ValidationError::NotPositive { field, value })
    }
}

// ---------------------------------------------------------------------------
// Runtime counters
// ---------------------------------------------------------------------------

/// Accumulated actuator runtime and the oil it consumed.
///
/// All three only grow between explicit resets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeCounters {
    pub pump_runtime_seconds: f64,
    pub fan_runtime_seconds: f64,
    pub oil_consumed_ml: f64,
}

impl RuntimeCounters {
    /// Every counter must be finite and not below zero.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_non_negative("pump_runtime_seconds", self.pump_runtime_seconds)?;
        check_non_negative("fan_runtime_seconds", self.fan_runtime_seconds)?;
        check_non_negative("oil_consumed_ml", self.oil_consumed_ml)?;
        Ok(())
    }
}

fn check_non_negative(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ValidationError::Negative { field, value })
    }
}

/// The single persisted record: configuration plus counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateRecord {
    pub config: SystemConfig,
    pub counters: RuntimeCounters,
}

impl StateRecord {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.config.validate()?;
        self.counters.validate()
    }
}

// ---------------------------------------------------------------------------
// Settings updates
// ---------------------------------------------------------------------------

/// A partial settings change as received from the outside world.
///
/// Every field is optional; absent fields are left untouched.  Call
/// [`validate`](Self::validate) to obtain an applicable [`SettingsUpdate`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SettingsPatch {
    pub enabled: Option<bool>,
    pub duty_cycle_index: Option<u8>,
    pub business_hours_enabled: Option<bool>,
    pub business_hours_start: Option<String>,
    pub business_hours_end: Option<String>,
    pub oil_usage_rate_ml_per_hour: Option<f64>,
    pub oil_bottle_capacity_ml: Option<f64>,
}

impl SettingsPatch {
    /// Check every present field.  Fails on the first invalid one; nothing
    /// is applied unless the whole patch is valid.
    pub fn validate(&self) -> Result<SettingsUpdate, ValidationError> {
        let time = |field: &'static str, raw: &Option<String>| {
            raw.as_deref()
                .map(|s| {
                    parse_time_of_day(s).ok_or_else(|| ValidationError::TimeOfDay {
                        field,
                        value: s.to_owned(),
                    })
                })
                .transpose()
        };

        Ok(SettingsUpdate {
            enabled: self.enabled,
            duty_cycle: self
                .duty_cycle_index
                .map(DutyCycleProfile::from_index)
                .transpose()?,
            business_hours_enabled: self.business_hours_enabled,
            business_hours_start: time("business_hours_start", &self.business_hours_start)?,
            business_hours_end: time("business_hours_end", &self.business_hours_end)?,
            oil_usage_rate_ml_per_hour: self
                .oil_usage_rate_ml_per_hour
                .map(|v| check_positive("oil_usage_rate_ml_per_hour", v))
                .transpose()?,
            oil_bottle_capacity_ml: self
                .oil_bottle_capacity_ml
                .map(|v| check_positive("oil_bottle_capacity_ml", v))
                .transpose()?,
        })
    }
}

/// A validated settings change, ready to apply at a tick boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SettingsUpdate {
    pub enabled: Option<bool>,
    pub duty_cycle: Option<DutyCycleProfile>,
    pub business_hours_enabled: Option<bool>,
    pub business_hours_start: Option<NaiveTime>,
    pub business_hours_end: Option<NaiveTime>,
    pub oil_usage_rate_ml_per_hour: Option<f64>,
    pub oil_bottle_capacity_ml: Option<f64>,
}

impl SettingsUpdate {
    pub fn apply_to(&self, cfg: &mut SystemConfig) {
        if let Some(v) = self.enabled {
            cfg.enabled = v;
        }
        if let Some(v) = self.duty_cycle {
            cfg.duty_cycle = v;
        }
        if let Some(v) = self.business_hours_enabled {
            cfg.business_hours_enabled = v;
        }
        if let Some(v) = self.business_hours_start {
            cfg.business_hours_start = v;
        }
        if let Some(v) = self.business_hours_end {
            cfg.business_hours_end = v;
        }
        if let Some(v) = self.oil_usage_rate_ml_per_hour {
            cfg.oil_usage_rate_ml_per_hour = v;
        }
        if let Some(v) = self.oil_bottle_capacity_ml {
            cfg.oil_bottle_capacity_ml = v;
        }
    }
}

/// Serde adapter storing a time of day as `"HH:MM"` (`"HH:MM:SS"` when the
/// seconds are set).
mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::schedule::{format_time_of_day, parse_time_of_day};

    pub fn serialize<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format_time_of_day(*time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        parse_time_of_day(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid time of day {raw:?}")))
    }
}
