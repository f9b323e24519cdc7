//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (GPIO, clock, files, event sinks) implement these
//! traits.  The [`AppService`](super::service::AppService) consumes them via
//! generics, so the domain core never touches hardware directly and every
//! port has a deterministic mock in the integration tests.

use core::fmt;
use core::time::Duration;

use chrono::{DateTime, NaiveTime, Utc};

use crate::config::StateRecord;
use crate::error::{HardwareError, ValidationError};
use crate::history::HistoryEntry;

// ───────────────────────────────────────────────────────────────
// Blower sense port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

pub trait HvacInputPort {
    /// Raw blower state, `true` = running.  Must not block: a line that
    /// cannot be read right now reports [`HardwareError::InputReadFailed`].
    fn sample_hvac(&mut self) -> Result<bool, HardwareError>;
}

// ───────────────────────────────────────────────────────────────
// Output port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// The two actuators.  Always switched together by the control loop but
/// addressed separately so a failure names the right line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputChannel {
    Pump,
    Fan,
}

impl fmt::Display for OutputChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pump => f.write_str("pump"),
            Self::Fan => f.write_str("fan"),
        }
    }
}

pub trait DiffuserOutputPort {
    /// Drive one output.  Setting an output to its current level is allowed.
    fn set_output(&mut self, channel: OutputChannel, on: bool) -> Result<(), HardwareError>;

    /// Best-effort: both outputs off, errors logged not returned.
    fn all_off(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

pub trait ClockPort {
    /// Monotonic time since an arbitrary origin.  Drives every timer.
    fn uptime(&self) -> Duration;

    /// Wall clock, used for history timestamps and alerts.
    fn now_utc(&self) -> DateTime<Utc>;

    /// Local time of day for the business-hours window.
    fn local_time_of_day(&self) -> NaiveTime;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / notification)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// State record port (config + counters)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the configuration and runtime counters as one record.
///
/// Implementations MUST validate before persisting and MUST replace the
/// stored record atomically.
pub trait StatePort {
    /// Returns [`PersistError::NotFound`] on first boot.
    fn load(&self) -> Result<StateRecord, PersistError>;

    fn save(&mut self, record: &StateRecord) -> Result<(), PersistError>;
}

// ───────────────────────────────────────────────────────────────
// History log port
// ───────────────────────────────────────────────────────────────

/// Append-only log of HVAC transitions.
pub trait HistoryLogPort {
    /// All readable entries.  A truncated trailing record is skipped.
    fn load_history(&self) -> Result<Vec<HistoryEntry>, PersistError>;

    fn append(&mut self, entry: &HistoryEntry) -> Result<(), PersistError>;

    /// Replace the whole log with `entries`.
    fn compact(&mut self, entries: &[HistoryEntry]) -> Result<(), PersistError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`StatePort`] and [`HistoryLogPort`] operations.
#[derive(Debug, Clone, PartialEq)]
pub enum PersistError {
    /// Nothing stored yet.
    NotFound,
    /// Underlying I/O failure.
    Io(std::io::ErrorKind),
    /// Record could not be serialised.
    Encode,
    /// Stored data failed to decode.
    Corrupted,
    /// Stored or outgoing record failed range validation.
    Invalid(ValidationError),
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "no stored state"),
            Self::Io(kind) => write!(f, "I/O error: {kind}"),
            Self::Encode => write!(f, "encode failed"),
            Self::Corrupted => write!(f, "stored data corrupted"),
            Self::Invalid(e) => write!(f, "invalid record: {e}"),
        }
    }
}

impl std::error::Error for PersistError {}

impl From<std::io::Error> for PersistError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound
        } else {
            Self::Io(e.kind())
        }
    }
}

impl From<ValidationError> for PersistError {
    fn from(e: ValidationError) -> Self {
        Self::Invalid(e)
    }
}
