//! CO2 regulation core.
//!
//! [`controller::Controller`] owns the control state and decides the fan
//! and valve commands each cycle. The valve sub-state lives in
//! [`valve::SharedValve`], the one piece of state the auto-close timer
//! touches from outside the control task.

pub mod controller;
pub mod valve;

/// Point-in-time copy of every controller field.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControlState {
    pub co2_setpoint: f32,
    pub current_co2: f32,
    pub current_temperature: f32,
    pub current_humidity: f32,
    pub current_pressure: f32,
    pub current_fan_speed: f32,
    pub valve_open: bool,
    pub safety_override_active: bool,
    pub valve_open_since_ms: Option<u64>,
    pub valve_last_closed_at_ms: Option<u64>,
}
