//! Actuator drivers.

pub mod duty_cycle;
pub mod relay;
