//! Temperature / relative humidity probe reader (Modbus RTU).
//!
//! Status register value `1` means the measurement is valid. Temperature
//! and humidity are read on every attempt regardless of status, both in
//! tenths of a unit. Temperature is a signed word so sub-zero readings in
//! an unheated greenhouse decode correctly.

use embedded_hal::delay::DelayNs;
use log::{debug, trace};

use crate::bus::{Register, RegisterBus};
use crate::config::SystemConfig;
use crate::error::{SensorError, ValidationFailure};
use crate::pins;

const STATUS_OK: u16 = 1;

/// One accepted temperature / humidity pair.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TempRhMeasurement {
    pub temperature_c: f32,
    pub humidity_pct: f32,
}

pub struct TempRhSensor {
    temperature: Register,
    humidity: Register,
    status: Register,
    max_attempts: u8,
    backoff_ms: u32,
    last: TempRhMeasurement,
}

impl TempRhSensor {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            temperature: Register::new(pins::TRH_UNIT, pins::TRH_REG_TEMPERATURE),
            humidity: Register::new(pins::TRH_UNIT, pins::TRH_REG_HUMIDITY),
            status: Register::new(pins::TRH_UNIT, pins::TRH_REG_STATUS),
            max_attempts: config.trh_max_attempts.max(1),
            backoff_ms: config.trh_retry_backoff_ms,
            last: TempRhMeasurement::default(),
        }
    }

    /// Last accepted pair. Unchanged by failed reads.
    pub fn last(&self) -> TempRhMeasurement {
        self.last
    }

    pub fn read(
        &mut self,
        bus: &mut impl RegisterBus,
        delay: &mut impl DelayNs,
    ) -> Result<TempRhMeasurement, SensorError> {
        let mut last_err = SensorError::Validation(ValidationFailure::DeviceStatus(0));
        for attempt in 1..=self.max_attempts {
            match self.attempt(bus) {
                Ok(m) => {
                    debug!(
                        "T/RH: accepted {:.1} C / {:.1} % (attempt {})",
                        m.temperature_c, m.humidity_pct, attempt
                    );
                    self.last = m;
                    return Ok(m);
                }
                Err(e) => {
                    trace!("T/RH: attempt {} discarded: {}", attempt, e);
                    last_err = e;
                }
            }
            if attempt < self.max_attempts {
                delay.delay_ms(self.backoff_ms);
            }
        }
        Err(last_err)
    }

    fn attempt(&mut self, bus: &mut impl RegisterBus) -> Result<TempRhMeasurement, SensorError> {
        let status = bus.read_register(self.status);
        let temperature = bus.read_register(self.temperature);
        let humidity = bus.read_register(self.humidity);

        match status? {
            STATUS_OK => {}
            s => return Err(ValidationFailure::DeviceStatus(s).into()),
        }
        Ok(TempRhMeasurement {
            temperature_c: f32::from(temperature? as i16) / 10.0,
            humidity_pct: f32::from(humidity?) / 10.0,
        })
    }
}
