//! Sensor subsystem.
//!
//! The only input this controller has is the blower sense line, sampled on
//! its own cadence by [`hvac::HvacMonitor`].

pub mod hvac;
