//! HVAC-triggered waterless oil diffuser controller.
//!
//! Exposes the control core and its adapters for the binary and for
//! integration testing.  Real GPIO lives behind the `rpi` feature; every
//! other module builds and runs on any host.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod fsm;
pub mod history;
pub mod oil;
pub mod pins;
pub mod schedule;
pub mod sensors;
