//! Application core — pure domain logic, zero I/O.
//!
//! This module holds the setpoint policy and cycle orchestration around
//! the CO2 [`Controller`](crate::control::controller::Controller). All
//! interaction with hardware happens through **port traits** defined in
//! [`ports`], keeping this layer fully testable without real peripherals.

pub mod channels;
pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
