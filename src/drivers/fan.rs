//! Ventilation fan driver (Produal MIO analog output module, Modbus RTU).
//!
//! The fan speed is a holding register scaled 0–1000 for 0–100 %.
//! The driver is a dumb actuator: it remembers the last commanded
//! percentage and does not retry. Whether a failed write matters is the
//! caller's business.

use log::trace;

use crate::bus::{Register, RegisterBus};
use crate::error::ActuatorError;
use crate::pins;

pub struct FanDriver {
    register: Register,
    full_scale: u16,
    speed: f32,
}

impl Default for FanDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl FanDriver {
    pub fn new() -> Self {
        Self {
            register: Register::new(pins::FAN_UNIT, pins::FAN_REG_SPEED),
            full_scale: pins::FAN_FULL_SCALE,
            speed: 0.0,
        }
    }

    /// Command `percent` (clamped to [0, 100]; NaN counts as 0).
    ///
    /// The commanded speed is recorded even if the write fails, so
    /// [`speed`](Self::speed) always reports the last command.
    pub fn set_speed(&mut self, bus: &mut impl RegisterBus, percent: f32) -> Result<(), ActuatorError> {
        let percent = if percent.is_nan() { 0.0 } else { percent.clamp(0.0, 100.0) };
        self.speed = percent;

        let raw = (percent / 100.0 * f32::from(self.full_scale)).round() as u16;
        trace!("fan: {:.1} % -> {}", percent, raw);
        bus.write_register(self.register, raw)
            .map_err(ActuatorError::FanWriteFailed)
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }
}
