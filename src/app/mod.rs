//! Application core: pure domain orchestration, zero direct I/O.
//!
//! Business rules for the diffuser live here and in the leaf modules the
//! [`service::AppService`] owns.  All interaction with hardware, storage
//! and the clock happens through **port traits** defined in [`ports`];
//! callers outside the loop thread go through [`handle::ControlHandle`].

pub mod commands;
pub mod events;
pub mod handle;
pub mod ports;
pub mod service;
