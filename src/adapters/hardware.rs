//! Hardware adapter: bridges the field bus and sensors to the domain ports.
//!
//! Owns the Modbus client, the [`SensorHub`] and the fan driver, exposing
//! them through [`SensorPort`] and [`ActuatorPort`]. The valve is not here:
//! the auto-close timer reaches it from another context, so it lives
//! behind [`SharedValve`](crate::control::valve::SharedValve) instead.
//!
//! Generic over the bus, the pressure sensor's I²C and the delay, so the
//! same adapter runs on the board and against host mocks.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{info, warn};

use crate::app::ports::{ActuatorPort, SensorPort};
use crate::bus::RegisterBus;
use crate::drivers::fan::FanDriver;
use crate::sensors::{SensorHub, SensorSnapshot};

pub struct HardwareAdapter<B: RegisterBus, I: I2c, D: DelayNs> {
    bus: B,
    delay: D,
    sensors: SensorHub<I>,
    fan: FanDriver,
}

impl<B: RegisterBus, I: I2c, D: DelayNs> HardwareAdapter<B, I, D> {
    pub fn new(bus: B, delay: D, sensors: SensorHub<I>, fan: FanDriver) -> Self {
        Self { bus, delay, sensors, fan }
    }

    /// Boot-time fan command, sent once before the control loop starts.
    pub fn start_fan(&mut self, percent: f32) {
        info!("HW | fan startup command {:.0}%", percent);
        self.set_fan_speed(percent);
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl<B: RegisterBus, I: I2c, D: DelayNs> SensorPort for HardwareAdapter<B, I, D> {
    fn sample(&mut self, now_ms: u64) -> SensorSnapshot {
        self.sensors.sample(&mut self.bus, &mut self.delay, now_ms)
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl<B: RegisterBus, I: I2c, D: DelayNs> ActuatorPort for HardwareAdapter<B, I, D> {
    fn set_fan_speed(&mut self, percent: f32) {
        if let Err(e) = self.fan.set_speed(&mut self.bus, percent) {
            warn!("HW | {}", e);
        }
    }

    fn fan_speed(&self) -> f32 {
        self.fan.speed()
    }
}
