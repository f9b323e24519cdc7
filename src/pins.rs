//! GPIO line assignments for the diffuser controller board.
//!
//! Single source of truth.  The GPIO adapter references this module rather
//! than hard-coding line numbers.  Offsets are BCM numbers on the Raspberry
//! Pi header, which map 1:1 to line offsets on the header's gpiochip.

/// Character device exposing the 40-pin header lines.
pub const GPIO_CHIP: &str = "/dev/gpiochip0";

/// Consumer label shown by `gpioinfo` for lines we hold.
pub const CONSUMER: &str = "diffuser";

// ---------------------------------------------------------------------------
// Outputs (active HIGH, driven through MOSFET boards)
// ---------------------------------------------------------------------------

/// Air pump feeding the nebuliser head.
pub const PUMP_GPIO: u32 = 25;
/// 12 V fan pushing the mist into the supply duct.
pub const FAN_GPIO: u32 = 24;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Blower sense from the air handler relay (optocoupled).
/// LOW = blower running, HIGH = blower off.  No internal pull.
pub const HVAC_SENSE_GPIO: u32 = 16;
