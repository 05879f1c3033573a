//! Sensor subsystem: individual readers and the aggregating [`SensorHub`].
//!
//! The set of sensor kinds is closed (CO2, temperature/humidity,
//! differential pressure). The hub owns every reader and produces a
//! [`SensorSnapshot`] once per control cycle.
//!
//! A failed acquisition never zeroes a value: the reading is marked
//! invalid and carries the last accepted value, so the controller can
//! skip it and keep what it had.

pub mod co2;
pub mod pressure;
pub mod temp_rh;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{debug, warn};

use crate::bus::RegisterBus;
use crate::config::SystemConfig;
use crate::error::SensorError;
use co2::Co2Sensor;
use pressure::PressureSensor;
use temp_rh::TempRhSensor;

/// The sensor kinds the controller knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    Co2,
    TempRh,
    Pressure,
}

impl SensorKind {
    /// Every kind, in sampling order.
    pub const ALL: [SensorKind; 3] = [Self::Co2, Self::TempRh, Self::Pressure];

    pub fn label(self) -> &'static str {
        match self {
            Self::Co2 => "CO2",
            Self::TempRh => "T/RH",
            Self::Pressure => "pressure",
        }
    }
}

/// One engineering-unit value and whether it was acquired this cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub value: f32,
    pub valid: bool,
}

impl SensorReading {
    pub fn fresh(value: f32) -> Self {
        Self { value, valid: true }
    }

    pub fn stale(value: f32) -> Self {
        Self { value, valid: false }
    }
}

/// A failed acquisition, kept for event reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorFault {
    pub kind: SensorKind,
    pub error: SensorError,
}

/// Everything one sampling pass produced. `None` means the sensor is not
/// fitted, so the controller leaves the matching field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorSnapshot {
    pub co2: Option<SensorReading>,
    pub temperature: Option<SensorReading>,
    pub humidity: Option<SensorReading>,
    pub pressure: Option<SensorReading>,
    pub faults: heapless::Vec<SensorFault, 3>,
}

impl SensorSnapshot {
    fn record(&mut self, kind: SensorKind, error: SensorError) {
        if error.is_failure() {
            warn!("SENSOR | {} read failed: {}", kind.label(), error);
            // At most one fault per kind, so this never overflows.
            let _ = self.faults.push(SensorFault { kind, error });
        } else {
            debug!("SENSOR | {} {}", kind.label(), error);
        }
    }
}

/// Owns every sensor reader.
pub struct SensorHub<I: I2c> {
    pub co2: Co2Sensor,
    pub temp_rh: TempRhSensor,
    pub pressure: Option<PressureSensor<I>>,
}

impl<I: I2c> SensorHub<I> {
    /// Build the Modbus readers from configuration. Pass the pressure
    /// sensor's I²C bus, or `None` if it is not fitted.
    pub fn new(config: &SystemConfig, pressure_i2c: Option<I>) -> Self {
        let pressure = if config.pressure_enabled {
            pressure_i2c.map(|i2c| PressureSensor::new(i2c, config))
        } else {
            None
        };
        Self {
            co2: Co2Sensor::new(config),
            temp_rh: TempRhSensor::new(config),
            pressure,
        }
    }

    /// Sample every fitted sensor once, in [`SensorKind::ALL`] order.
    pub fn sample(
        &mut self,
        bus: &mut impl RegisterBus,
        delay: &mut impl DelayNs,
        now_ms: u64,
    ) -> SensorSnapshot {
        let mut snap = SensorSnapshot::default();

        for kind in SensorKind::ALL {
            match kind {
                SensorKind::Co2 => {
                    snap.co2 = Some(match self.co2.read(bus, delay, now_ms) {
                        Ok(ppm) => SensorReading::fresh(ppm),
                        Err(e) => {
                            snap.record(kind, e);
                            SensorReading::stale(self.co2.last_ppm())
                        }
                    });
                }
                SensorKind::TempRh => match self.temp_rh.read(bus, delay) {
                    Ok(m) => {
                        snap.temperature = Some(SensorReading::fresh(m.temperature_c));
                        snap.humidity = Some(SensorReading::fresh(m.humidity_pct));
                    }
                    Err(e) => {
                        snap.record(kind, e);
                        let last = self.temp_rh.last();
                        snap.temperature = Some(SensorReading::stale(last.temperature_c));
                        snap.humidity = Some(SensorReading::stale(last.humidity_pct));
                    }
                },
                SensorKind::Pressure => {
                    let Some(sensor) = self.pressure.as_mut() else {
                        continue;
                    };
                    snap.pressure = Some(match sensor.read() {
                        Ok(pa) => SensorReading::fresh(pa),
                        Err(e) => {
                            let last = sensor.last_pa();
                            snap.record(kind, e);
                            SensorReading::stale(last)
                        }
                    });
                }
            }
        }

        snap
    }
}
