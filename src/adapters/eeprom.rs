//! I²C EEPROM setpoint store (24C-series, 16-bit memory addresses).
//!
//! The setpoint occupies two bytes, big-endian, at a fixed offset. Bytes
//! are written one transaction at a time, each followed by the device's
//! internal write cycle; reads set the address pointer and read both
//! bytes in a single `write_read`.
//!
//! An erased part reads `0xFFFF`, reported as [`StorageError::Blank`]. A
//! value above the setpoint ceiling cannot have come from a valid write and
//! is reported as [`StorageError::Corrupted`].

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{debug, warn};

use crate::app::ports::SetpointStore;
use crate::error::StorageError;
use crate::sensors::pressure::map_i2c_error;

/// Internal write cycle after each byte (ms).
const WRITE_CYCLE_MS: u32 = 5;

const ERASED: u16 = 0xFFFF;

pub struct EepromStore<I: I2c, D: DelayNs> {
    i2c: I,
    delay: D,
    address: u8,
    offset: u16,
    max_valid: u16,
}

impl<I: I2c, D: DelayNs> EepromStore<I, D> {
    pub fn new(i2c: I, delay: D, address: u8, offset: u16, max_valid: u16) -> Self {
        Self { i2c, delay, address, offset, max_valid }
    }

    fn write_byte(&mut self, mem: u16, data: u8) -> Result<(), StorageError> {
        let [hi, lo] = mem.to_be_bytes();
        self.i2c
            .write(self.address, &[hi, lo, data])
            .map_err(|e| map_i2c_error(&e))?;
        self.delay.delay_ms(WRITE_CYCLE_MS);
        Ok(())
    }

    /// Raw slot contents, unvalidated.
    fn read_raw(&mut self) -> Result<u16, StorageError> {
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(self.address, &self.offset.to_be_bytes(), &mut buf)
            .map_err(|e| map_i2c_error(&e))?;
        Ok(u16::from_be_bytes(buf))
    }

    #[cfg(test)]
    fn release(self) -> (I, D) {
        (self.i2c, self.delay)
    }
}

impl<I: I2c, D: DelayNs> SetpointStore for EepromStore<I, D> {
    fn load(&mut self) -> Result<u16, StorageError> {
        let raw = self.read_raw().inspect_err(|e| warn!("STORE | read failed: {}", e))?;
        match raw {
            ERASED => Err(StorageError::Blank),
            v if v > self.max_valid => Err(StorageError::Corrupted(v)),
            v => Ok(v),
        }
    }

    fn store(&mut self, value: u16) -> Result<(), StorageError> {
        let [hi, lo] = value.to_be_bytes();
        self.write_byte(self.offset, hi)?;
        self.write_byte(self.offset.wrapping_add(1), lo)?;
        debug!("STORE | wrote {} at 0x{:04X}", value, self.offset);
        Ok(())
    }
}
