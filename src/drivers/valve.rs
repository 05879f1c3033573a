//! CO2 injection solenoid valve on a single GPIO (high = open).
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives the pin via hw_init helpers.
//! On host/test: tracks the level in memory only.

use log::debug;

use crate::app::ports::ValveOutput;
use crate::drivers::hw_init;
use crate::error::ActuatorError;

pub struct ValveDriver {
    gpio: i32,
    level: bool,
}

impl ValveDriver {
    pub fn new(gpio: i32) -> Self {
        Self { gpio, level: false }
    }

    /// Last level successfully written.
    pub fn level(&self) -> bool {
        self.level
    }
}

impl ValveOutput for ValveDriver {
    fn set_open(&mut self, open: bool) -> Result<(), ActuatorError> {
        hw_init::gpio_write(self.gpio, open).map_err(|rc| {
            debug!("valve: gpio_set_level({}) rc={}", self.gpio, rc);
            ActuatorError::GpioWriteFailed
        })?;
        self.level = open;
        Ok(())
    }
}
