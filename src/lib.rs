//! Greenhouse CO2 controller firmware library.
//!
//! Exposes the control core, drivers and adapters for integration testing
//! and external inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod bus;
pub mod config;
pub mod control;
pub mod error;
pub mod events;
pub mod pins;
pub mod safety;
pub mod scheduler;
pub mod sensors;
pub mod telemetry;
pub mod ui;

// Host builds get simulation stubs from the cfg gates inside these.
pub mod adapters;
pub mod drivers;
