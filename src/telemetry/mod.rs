//! Cloud telemetry: form encoding, command parsing and the uplink worker.

pub mod command;
pub mod form;
pub mod uplink;
