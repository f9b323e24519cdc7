//! Hardware adapter: bridges embedded-hal pins to the domain port traits.
//!
//! Owns the blower sense input and the pump/fan relays.  Generic over the
//! pin types so the same adapter drives Linux cdev lines on the Pi and
//! simulated pins everywhere else.  Dropping the adapter drives both
//! outputs low, so the actuators are released on every exit path,
//! including unwinding.
//!
//! On the Pi every pin access is a single line-value ioctl on the cdev handle
//! (`GPIOHANDLE_GET_LINE_VALUES` / `SET_LINE_VALUES`).  The kernel answers
//! these from the line state without waiting on the device, so they return
//! promptly or fail; the loop only has to handle the failure.

use embedded_hal::digital::{Error as _, InputPin, OutputPin};
use log::{debug, warn};

use crate::app::ports::{DiffuserOutputPort, HvacInputPort, OutputChannel};
use crate::drivers::relay::Relay;
use crate::error::HardwareError;

pub struct HardwareAdapter<I: InputPin, O: OutputPin> {
    /// Active low: LOW = blower running.
    hvac_sense: I,
    pump: Relay<O>,
    fan: Relay<O>,
}

impl<I: InputPin, O: OutputPin> HardwareAdapter<I, O> {
    pub fn new(hvac_sense: I, pump: O, fan: O) -> Self {
        Self {
            hvac_sense,
            pump: Relay::new(pump, OutputChannel::Pump),
            fan: Relay::new(fan, OutputChannel::Fan),
        }
    }

    pub fn pump_on(&self) -> bool {
        self.pump.is_on()
    }

    pub fn fan_on(&self) -> bool {
        self.fan.is_on()
    }
}

// ── HvacInputPort implementation ──────────────────────────────

impl<I: InputPin, O: OutputPin> HvacInputPort for HardwareAdapter<I, O> {
    fn sample_hvac(&mut self) -> Result<bool, HardwareError> {
        self.hvac_sense.is_low().map_err(|e| {
            debug!("HVAC sense read error: {:?}", e.kind());
            HardwareError::InputReadFailed
        })
    }
}

// ── DiffuserOutputPort implementation ─────────────────────────

impl<I: InputPin, O: OutputPin> DiffuserOutputPort for HardwareAdapter<I, O> {
    fn set_output(&mut self, channel: OutputChannel, on: bool) -> Result<(), HardwareError> {
        match channel {
            OutputChannel::Pump => self.pump.set(on),
            OutputChannel::Fan => self.fan.set(on),
        }
    }

    fn all_off(&mut self) {
        for relay_result in [self.pump.set(false), self.fan.set(false)] {
            if let Err(e) = relay_result {
                warn!("all_off: {e}");
            }
        }
    }
}

impl<I: InputPin, O: OutputPin> Drop for HardwareAdapter<I, O> {
    fn drop(&mut self) {
        self.all_off();
    }
}
