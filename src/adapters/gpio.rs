//! GPIO line acquisition.
//!
//! With the `rpi` feature the pins are Linux character-device lines
//! (`/dev/gpiochipN`) driven through `linux-embedded-hal`.  Without it,
//! [`SimPin`]s stand in so the controller runs on any host; set
//! `DIFFUSER_SIM_HVAC=on` to simulate a running blower.
//!
//! Either way [`open`] returns a ready [`HardwareAdapter`] with both outputs
//! untouched; the control loop asserts OFF on its first tick.

use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

#[cfg(not(feature = "rpi"))]
use log::info;

#[cfg(not(feature = "rpi"))]
use super::hardware::HardwareAdapter;
#[cfg(not(feature = "rpi"))]
use crate::error::HardwareError;

#[cfg(feature = "rpi")]
pub use cdev::open;

// ═══════════════════════════════════════════════════════════════
//  Character-device backend
// ═══════════════════════════════════════════════════════════════

#[cfg(feature = "rpi")]
mod cdev {
    use linux_embedded_hal::CdevPin;
    use linux_embedded_hal::gpio_cdev::{Chip, LineRequestFlags};
    use log::{info, warn};

    use crate::adapters::hardware::HardwareAdapter;
    use crate::error::HardwareError;
    use crate::pins;

    fn request(
        chip: &mut Chip,
        offset: u32,
        flags: LineRequestFlags,
        what: &'static str,
    ) -> Result<CdevPin, HardwareError> {
        let handle = chip
            .get_line(offset)
            .and_then(|line| line.request(flags, 0, pins::CONSUMER))
            .map_err(|e| {
                warn!("GPIO{offset} ({what}): {e}");
                HardwareError::Init(what)
            })?;
        CdevPin::new(handle).map_err(|e| {
            warn!("GPIO{offset} ({what}): {e}");
            HardwareError::Init(what)
        })
    }

    pub fn open(chip_path: &str) -> Result<HardwareAdapter<CdevPin, CdevPin>, HardwareError> {
        let mut chip = Chip::new(chip_path).map_err(|e| {
            warn!("{chip_path}: {e}");
            HardwareError::Init("cannot open gpiochip")
        })?;

        let sense = request(
            &mut chip,
            pins::HVAC_SENSE_GPIO,
            LineRequestFlags::INPUT,
            "hvac sense",
        )?;
        let pump = request(&mut chip, pins::PUMP_GPIO, LineRequestFlags::OUTPUT, "pump")?;
        let fan = request(&mut chip, pins::FAN_GPIO, LineRequestFlags::OUTPUT, "fan")?;

        info!(
            "GPIO: {chip_path} sense={} pump={} fan={}",
            pins::HVAC_SENSE_GPIO,
            pins::PUMP_GPIO,
            pins::FAN_GPIO
        );
        Ok(HardwareAdapter::new(sense, pump, fan))
    }
}

// ═══════════════════════════════════════════════════════════════
//  Simulation backend
// ═══════════════════════════════════════════════════════════════

/// In-memory pin.  Clones share the same level, so a test or simulator can
/// keep one end and hand the other to the adapter.
#[derive(Debug, Clone)]
pub struct SimPin {
    level: Arc<AtomicBool>,
}

impl SimPin {
    pub fn new(high: bool) -> Self {
        Self {
            level: Arc::new(AtomicBool::new(high)),
        }
    }

    pub fn level(&self) -> bool {
        self.level.load(Ordering::Acquire)
    }

    pub fn set_level(&self, high: bool) {
        self.level.store(high, Ordering::Release);
    }
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl InputPin for SimPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.level())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.level())
    }
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.set_level(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.set_level(true);
        Ok(())
    }
}

/// Simulated board.  `chip_path` is only logged.
#[cfg(not(feature = "rpi"))]
pub fn open(chip_path: &str) -> Result<HardwareAdapter<SimPin, SimPin>, HardwareError> {
    let blower_running = std::env::var("DIFFUSER_SIM_HVAC")
        .is_ok_and(|v| matches!(v.trim(), "1" | "on" | "true"));
    info!(
        "GPIO: simulation backend (would use {chip_path}), blower {}",
        if blower_running { "ON" } else { "OFF" }
    );
    // Sense line is active low.
    Ok(HardwareAdapter::new(
        SimPin::new(!blower_running),
        SimPin::new(false),
        SimPin::new(false),
    ))
}
