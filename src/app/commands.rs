//! Inbound commands to the application service.
//!
//! Requests from the outside world arrive through the
//! [`ControlHandle`](super::handle::ControlHandle) mailbox and are applied
//! by the [`AppService`](super::service::AppService) at the start of the
//! next tick, never in the middle of one.

use crate::config::SettingsUpdate;

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    /// Apply an already-validated partial settings change.
    UpdateSettings(SettingsUpdate),

    /// Zero pump/fan runtime and oil consumption (new bottle).
    ResetCounters,
}
