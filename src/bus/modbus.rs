//! Modbus RTU client.
//!
//! Implements the two function codes the greenhouse peripherals need:
//! Read Holding Registers (0x03, single register) and Write Single
//! Register (0x06). Frames are protected by CRC-16/MODBUS, transmitted
//! low byte first.
//!
//! ```text
//! request 0x03:  unit | 03 | addr_hi addr_lo | 00 01 | crc_lo crc_hi
//! response 0x03: unit | 03 | 02 | val_hi val_lo | crc_lo crc_hi
//! request 0x06:  unit | 06 | addr_hi addr_lo | val_hi val_lo | crc_lo crc_hi
//! response 0x06: echo of the request
//! exception:     unit | fn|0x80 | code | crc_lo crc_hi
//! ```

use log::trace;

use super::{Register, RegisterBus};
use crate::error::TransportError;

const FN_READ_HOLDING: u8 = 0x03;
const FN_WRITE_SINGLE: u8 = 0x06;
const EXCEPTION_FLAG: u8 = 0x80;

/// Shortest frame the server can answer with (an exception response).
const MIN_RESPONSE_LEN: usize = 5;

/// Byte-level serial transport underneath the RTU framing.
pub trait SerialLink {
    /// Queue every byte for transmission and wait until they are sent.
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Read up to `buf.len()` bytes, waiting at most `timeout_ms`.
    /// Returns 0 when nothing arrived in time.
    fn read(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize, TransportError>;

    /// Discard stale input (late replies from a previous transaction).
    fn clear_input(&mut self);
}

/// CRC-16/MODBUS: reflected polynomial 0xA001, initial value 0xFFFF.
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in data {
        crc ^= u16::from(byte);
        for _ in 0..8 {
            crc = if crc & 1 != 0 { (crc >> 1) ^ 0xA001 } else { crc >> 1 };
        }
    }
    crc
}

/// Append the CRC (low byte first) to the first `len` bytes of `frame`.
fn seal(frame: &mut [u8; 8], len: usize) {
    let crc = crc16(&frame[..len]).to_le_bytes();
    frame[len] = crc[0];
    frame[len + 1] = crc[1];
}

/// Single-master RTU client over any [`SerialLink`].
pub struct ModbusRtu<S: SerialLink> {
    link: S,
    timeout_ms: u32,
}

impl<S: SerialLink> ModbusRtu<S> {
    pub fn new(link: S, timeout_ms: u32) -> Self {
        Self { link, timeout_ms }
    }

    pub fn link(&self) -> &S {
        &self.link
    }

    /// Fill `frame[from..to]` or fail with `Timeout` (nothing of the frame
    /// arrived) or `Length` (the frame stopped short). `Length` carries
    /// frame-level byte counts.
    fn read_exact(&mut self, frame: &mut [u8], from: usize, to: usize) -> Result<(), TransportError> {
        let mut filled = from;
        while filled < to {
            let n = self.link.read(&mut frame[filled..to], self.timeout_ms)?;
            if n == 0 {
                return Err(if filled == 0 {
                    TransportError::Timeout
                } else {
                    TransportError::Length {
                        expected: to as u8,
                        actual: filled as u8,
                    }
                });
            }
            filled += n;
        }
        Ok(())
    }

    /// Send `request` and read the reply into `response`, whose length is
    /// the expected size of a normal (non-exception) reply.
    fn transact(&mut self, request: &[u8; 8], response: &mut [u8]) -> Result<(), TransportError> {
        let unit = request[0];
        let function = request[1];

        self.link.clear_input();
        self.link.write_all(request)?;

        self.read_exact(response, 0, MIN_RESPONSE_LEN)?;
        if response[0] != unit {
            return Err(TransportError::Bus);
        }
        if response[1] == function | EXCEPTION_FLAG {
            if crc16(&response[..MIN_RESPONSE_LEN]) != 0 {
                return Err(TransportError::Crc);
            }
            return Err(TransportError::Exception(response[2]));
        }
        if response[1] != function {
            return Err(TransportError::Bus);
        }

        let total = response.len();
        self.read_exact(response, MIN_RESPONSE_LEN, total)?;
        if crc16(response) != 0 {
            return Err(TransportError::Crc);
        }
        Ok(())
    }
}

impl<S: SerialLink> RegisterBus for ModbusRtu<S> {
    fn read_register(&mut self, reg: Register) -> Result<u16, TransportError> {
        let addr = reg.address.to_be_bytes();
        let mut request = [reg.unit, FN_READ_HOLDING, addr[0], addr[1], 0x00, 0x01, 0, 0];
        seal(&mut request, 6);

        let mut response = [0u8; 7];
        self.transact(&request, &mut response)?;
        if response[2] != 2 {
            return Err(TransportError::Length {
                expected: 2,
                actual: response[2],
            });
        }
        let value = u16::from_be_bytes([response[3], response[4]]);
        trace!("modbus: {}:{} -> {}", reg.unit, reg.address, value);
        Ok(value)
    }

    fn write_register(&mut self, reg: Register, value: u16) -> Result<(), TransportError> {
        let addr = reg.address.to_be_bytes();
        let val = value.to_be_bytes();
        let mut request = [reg.unit, FN_WRITE_SINGLE, addr[0], addr[1], val[0], val[1], 0, 0];
        seal(&mut request, 6);

        let mut response = [0u8; 8];
        self.transact(&request, &mut response)?;
        if response != request {
            return Err(TransportError::Bus);
        }
        trace!("modbus: {}:{} <- {}", reg.unit, reg.address, value);
        Ok(())
    }
}

// ── ESP-IDF UART link ─────────────────────────────────────────

#[cfg(target_os = "espidf")]
impl SerialLink for esp_idf_hal::uart::UartDriver<'_> {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        use esp_idf_hal::delay::TickType;

        let mut offset = 0;
        while offset < bytes.len() {
            let n = esp_idf_hal::uart::UartDriver::write(self, &bytes[offset..])
                .map_err(|_| TransportError::Bus)?;
            offset += n;
        }
        self.wait_tx_done(TickType::new_millis(u64::from(crate::pins::MODBUS_TIMEOUT_MS)).ticks())
            .map_err(|_| TransportError::Timeout)
    }

    fn read(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize, TransportError> {
        use esp_idf_hal::delay::TickType;

        esp_idf_hal::uart::UartDriver::read(self, buf, TickType::new_millis(u64::from(timeout_ms)).ticks())
            .map_err(|_| TransportError::Bus)
    }

    fn clear_input(&mut self) {
        if let Err(e) = self.clear_rx() {
            log::warn!("modbus: UART RX flush failed: {}", e);
        }
    }
}

// ── Tests ────────────────────────────────────────────────────
