//! Register-oriented field bus.
//!
//! Every Modbus peripheral (CO2 probe, T/RH probe, fan controller) is
//! addressed as a `(unit, register)` pair holding one 16-bit word. Sensor
//! readers and the fan driver talk to the [`RegisterBus`] port; the
//! [`modbus::ModbusRtu`] client implements it over a serial link.

pub mod modbus;

use crate::error::TransportError;

/// A single holding register on a bus unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Register {
    pub unit: u8,
    pub address: u16,
}

impl Register {
    pub const fn new(unit: u8, address: u16) -> Self {
        Self { unit, address }
    }
}

/// Word-level access to holding registers.
///
/// Each call is one complete transaction, bounded by the transport's
/// response timeout. There is no cancellation.
pub trait RegisterBus {
    fn read_register(&mut self, reg: Register) -> Result<u16, TransportError>;

    fn write_register(&mut self, reg: Register, value: u16) -> Result<(), TransportError>;
}

impl<T: RegisterBus + ?Sized> RegisterBus for &mut T {
    fn read_register(&mut self, reg: Register) -> Result<u16, TransportError> {
        (**self).read_register(reg)
    }

    fn write_register(&mut self, reg: Register, value: u16) -> Result<(), TransportError> {
        (**self).write_register(reg, value)
    }
}
