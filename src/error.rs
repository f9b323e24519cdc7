//! Error types shared across the controller.
//!
//! Hardware and validation errors are plain enums with hand-written
//! `Display` impls so they can be logged, compared in tests, and carried
//! through the request mailbox without allocation in the hot path.
//! Persistence errors live next to the storage ports in
//! [`app::ports`](crate::app::ports).

use core::fmt;

use crate::app::ports::OutputChannel;

// ---------------------------------------------------------------------------
// Hardware errors
// ---------------------------------------------------------------------------

/// A GPIO operation failed.
///
/// Never fatal: the control loop logs it and holds the previous state for
/// the tick, retrying on the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareError {
    /// Reading the blower sense line returned an error.
    InputReadFailed,
    /// Driving an output line returned an error.
    OutputWriteFailed(OutputChannel),
    /// A line could not be requested from the GPIO chip.
    Init(&'static str),
}

impl fmt::Display for HardwareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InputReadFailed => write!(f, "blower sense read failed"),
            Self::OutputWriteFailed(channel) => write!(f, "{channel} output write failed"),
            Self::Init(msg) => write!(f, "GPIO init: {msg}"),
        }
    }
}

impl std::error::Error for HardwareError {}

// ---------------------------------------------------------------------------
// Validation errors
// ---------------------------------------------------------------------------

/// A settings value was rejected.  Carries the offending field so the
/// caller can report it verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Duty-cycle index outside the fixed profile table.
    DutyCycleIndex(u8),
    /// Business-hours boundary is not a valid `HH:MM` time of day.
    TimeOfDay { field: &'static str, value: String },
    /// Oil rate or capacity is zero, negative, or not finite.
    NotPositive { field: &'static str, value: f64 },
    /// A stored runtime counter is negative or not finite.
    Negative { field: &'static str, value: f64 },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DutyCycleIndex(idx) => {
                write!(f, "duty_cycle_index must be 0-9, got {idx}")
            }
            Self::TimeOfDay { field, value } => {
                write!(f, "{field} must be a time of day as HH:MM, got {value:?}")
            }
            Self::NotPositive { field, value } => {
                write!(f, "{field} must be a positive number, got {value}")
            }
            Self::Negative { field, value } => {
                write!(f, "{field} must be zero or more, got {value}")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

// ---------------------------------------------------------------------------
// Request errors
// ---------------------------------------------------------------------------

/// Why a request to the control loop was not accepted.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestError {
    /// The payload failed validation.  Nothing was queued.
    Invalid(ValidationError),
    /// The request mailbox is full; retry after the next tick.
    Busy,
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid(e) => write!(f, "{e}"),
            Self::Busy => write!(f, "control loop busy, try again"),
        }
    }
}

impl std::error::Error for RequestError {}

impl From<ValidationError> for RequestError {
    fn from(e: ValidationError) -> Self {
        Self::Invalid(e)
    }
}
