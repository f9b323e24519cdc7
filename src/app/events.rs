//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log lines, push notifications, etc.

use crate::config::SystemConfig;
use crate::fsm::StateId;
use crate::oil::DepletionAlert;
use crate::sensors::hvac::HvacState;

use super::handle::StatusSnapshot;

#[derive(Debug, Clone)]
pub enum AppEvent {
    /// The control loop has started (carries initial activation state).
    Started(StateId),

    /// The activation policy moved.
    StateChanged { from: StateId, to: StateId },

    /// Debounced blower state flipped.
    HvacChanged(HvacState),

    /// Pump and fan were switched.
    OutputsChanged { on: bool },

    /// A settings update was applied (carries the resulting config).
    SettingsApplied(SystemConfig),

    /// Runtime counters were zeroed.
    CountersReset,

    /// Oil ran out.  Emitted once per depletion episode.
    OilDepleted(DepletionAlert),

    /// Periodic status snapshot.
    Telemetry(StatusSnapshot),
}
