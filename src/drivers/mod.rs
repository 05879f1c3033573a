//! Actuator drivers, the rotary ISR front end, the valve auto-close
//! timer and hardware initialisation.

pub mod fan;
pub mod hw_init;
pub mod hw_timer;
pub mod rotary;
pub mod valve;
