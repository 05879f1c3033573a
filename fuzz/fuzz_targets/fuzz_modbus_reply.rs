//! Fuzz target: `ModbusRtu` reply handling
//!
//! Feeds arbitrary bytes back as the server's answer to a read and a write
//! transaction, delivered in arbitrary chunk sizes.
//!
//! Invariants checked:
//! - No panics under any byte sequence
//! - A successful read implies the reply carried a valid CRC
//!
//! cargo fuzz run fuzz_modbus_reply

#![no_main]

use greenhouse::bus::modbus::{crc16, ModbusRtu, SerialLink};
use greenhouse::bus::{Register, RegisterBus};
use greenhouse::error::TransportError;
use libfuzzer_sys::fuzz_target;

struct Replay<'a> {
    data: &'a [u8],
    chunk: usize,
}

impl SerialLink for Replay<'_> {
    fn write_all(&mut self, _bytes: &[u8]) -> Result<(), TransportError> {
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8], _timeout_ms: u32) -> Result<usize, TransportError> {
        let n = buf.len().min(self.data.len()).min(self.chunk);
        buf[..n].copy_from_slice(&self.data[..n]);
        self.data = &self.data[n..];
        Ok(n)
    }

    fn clear_input(&mut self) {}
}

fuzz_target!(|data: &[u8]| {
    let Some((&chunk, reply)) = data.split_first() else {
        return;
    };
    let chunk = usize::from(chunk % 8) + 1;
    let reg = Register::new(reply.first().copied().unwrap_or(1), 0x0000);

    let mut bus = ModbusRtu::new(Replay { data: reply, chunk }, 0);
    if bus.read_register(reg).is_ok() {
        assert_eq!(crc16(&reply[..7]), 0, "read accepted a reply with a bad CRC");
    }

    let mut bus = ModbusRtu::new(Replay { data: reply, chunk }, 0);
    let _ = bus.write_register(reg, 0x1234);
});
