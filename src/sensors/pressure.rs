//! Sensirion SDP6xx differential pressure sensor (I²C).
//!
//! Single-shot: write the trigger-measurement command, then read the
//! big-endian signed result (plus a CRC byte when checking is enabled).
//! The scale factor is 60 counts per pascal.
//!
//! The sensor is calibrated at 966 mbar absolute. When a site altitude is
//! configured the reading is corrected with the barometric formula:
//!
//! ```text
//! dp_eff = dp_sensor · 966 / p_amb(h)
//! p_amb(h) = 1013.25 · (1 − 0.0065·h / 288.15)^5.2559   [mbar]
//! ```

use embedded_hal::i2c::{ErrorKind, I2c};
use log::trace;

use crate::config::SystemConfig;
use crate::error::{SensorError, TransportError};
use crate::pins;

/// Trigger differential pressure measurement (hold master).
const CMD_TRIGGER: u8 = 0xF1;
const COUNTS_PER_PA: f32 = 60.0;
const CALIBRATION_MBAR: f32 = 966.0;

/// CRC-8 as used by Sensirion SDP6xx: polynomial 0x31, initial value 0x00.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc: u8 = 0x00;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 { (crc << 1) ^ 0x31 } else { crc << 1 };
        }
    }
    crc
}

/// Standard-atmosphere ambient pressure at `altitude_m` (mbar).
pub fn ambient_pressure_mbar(altitude_m: f32) -> f32 {
    1013.25 * (1.0 - 0.0065 * altitude_m / 288.15).powf(5.2559)
}

pub(crate) fn map_i2c_error<E: embedded_hal::i2c::Error>(e: &E) -> TransportError {
    match e.kind() {
        ErrorKind::NoAcknowledge(_) => TransportError::NoDevice,
        _ => TransportError::Bus,
    }
}

pub struct PressureSensor<I: I2c> {
    i2c: I,
    address: u8,
    crc: bool,
    /// `None` disables altitude compensation.
    compensation: Option<f32>,
    last_pa: f32,
}

impl<I: I2c> PressureSensor<I> {
    pub fn new(i2c: I, config: &SystemConfig) -> Self {
        let compensation = (config.altitude_m != 0.0)
            .then(|| CALIBRATION_MBAR / ambient_pressure_mbar(config.altitude_m));
        Self {
            i2c,
            address: pins::PRESSURE_ADDR,
            crc: config.pressure_crc,
            compensation,
            last_pa: 0.0,
        }
    }

    /// Last accepted differential pressure (Pa). Unchanged by failed reads.
    pub fn last_pa(&self) -> f32 {
        self.last_pa
    }

    pub fn read(&mut self) -> Result<f32, SensorError> {
        self.i2c
            .write(self.address, &[CMD_TRIGGER])
            .map_err(|e| map_i2c_error(&e))?;

        let mut buf = [0u8; 3];
        let len = if self.crc { 3 } else { 2 };
        self.i2c
            .read(self.address, &mut buf[..len])
            .map_err(|e| map_i2c_error(&e))?;

        if self.crc && crc8(&buf[..2]) != buf[2] {
            return Err(TransportError::Crc.into());
        }

        let raw = i16::from_be_bytes([buf[0], buf[1]]);
        let mut pa = f32::from(raw) / COUNTS_PER_PA;
        if let Some(factor) = self.compensation {
            pa *= factor;
        }
        trace!("pressure: raw={} -> {:.2} Pa", raw, pa);
        self.last_pa = pa;
        Ok(pa)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::{ErrorType, NoAcknowledgeSource, Operation};

    struct FakeSdp {
        reply: [u8; 3],
        present: bool,
        writes: Vec<Vec<u8>>,
    }

    impl ErrorType for FakeSdp {
        type Error = ErrorKind;
    }

    impl I2c for FakeSdp {
        fn transaction(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), Self::Error> {
            if !self.present || address != pins::PRESSURE_ADDR {
                return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
            }
            for op in operations {
                match op {
                    Operation::Write(bytes) => self.writes.push(bytes.to_vec()),
                    Operation::Read(buf) => {
                        let n = buf.len();
                        buf.copy_from_slice(&self.reply[..n]);
                    }
                }
            }
            Ok(())
        }
    }

    fn fake(raw: i16, present: bool) -> FakeSdp {
        let b = raw.to_be_bytes();
        FakeSdp { reply: [b[0], b[1], crc8(&b)], present, writes: Vec::new() }
    }

    #[test]
    fn crc8_reference_vector() {
        assert_eq!(crc8(&[0xBE, 0xEF]), 0x13);
        assert_eq!(crc8(&[0x00, 0x00]), 0x00);
    }

    #[test]
    fn decodes_signed_counts() {
        let mut s = PressureSensor::new(fake(-600, true), &SystemConfig::default());
        let pa = s.read().unwrap();
        assert!((pa + 10.0).abs() < 1e-4);
        assert_eq!(s.i2c.writes, vec![vec![CMD_TRIGGER]]);
    }

    #[test]
    fn crc_mismatch_is_rejected_and_value_kept() {
        let mut config = SystemConfig::default();
        config.pressure_crc = true;
        let mut s = PressureSensor::new(fake(120, true), &config);
        assert!((s.read().unwrap() - 2.0).abs() < 1e-4);

        s.i2c.reply[2] ^= 0xFF;
        assert_eq!(s.read(), Err(SensorError::Transport(TransportError::Crc)));
        assert!((s.last_pa() - 2.0).abs() < 1e-4);
    }

    #[test]
    fn absent_device_maps_to_no_device() {
        let mut s = PressureSensor::new(fake(0, false), &SystemConfig::default());
        assert_eq!(s.read(), Err(SensorError::Transport(TransportError::NoDevice)));
    }

    #[test]
    fn altitude_compensation_scales_reading() {
        let p = ambient_pressure_mbar(500.0);
        assert!((p - 954.61).abs() < 0.05);

        let mut config = SystemConfig::default();
        config.altitude_m = 500.0;
        let mut s = PressureSensor::new(fake(600, true), &config);
        let pa = s.read().unwrap();
        assert!((pa - 10.0 * 966.0 / p).abs() < 1e-3);
    }
}
