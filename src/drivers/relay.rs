//! Digital output driver for the pump and fan MOSFET boards.
//!
//! A dumb actuator: every `set` writes the line, so re-asserting the
//! current level after a restart or a failed write is harmless.  Whether
//! an output *should* be on is decided by the duty-cycle driver.

use embedded_hal::digital::{Error as _, OutputPin};
use log::debug;

use crate::app::ports::OutputChannel;
use crate::error::HardwareError;

pub struct Relay<P> {
    pin: P,
    channel: OutputChannel,
    on: bool,
}

impl<P: OutputPin> Relay<P> {
    /// Wraps an already-configured output.  The line is not touched until
    /// the first `set`.
    pub fn new(pin: P, channel: OutputChannel) -> Self {
        Self {
            pin,
            channel,
            on: false,
        }
    }

    pub fn set(&mut self, on: bool) -> Result<(), HardwareError> {
        let result = if on {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        if let Err(e) = result {
            debug!("{} write error: {:?}", self.channel, e.kind());
            return Err(HardwareError::OutputWriteFailed(self.channel));
        }
        self.on = on;
        Ok(())
    }

    pub fn is_on(&self) -> bool {
        self.on
    }
}
