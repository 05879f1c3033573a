//! The CO2 controller: the single authority over fan and valve commands.
//!
//! One [`Controller::update`] per control cycle:
//!
//! ```text
//!  sample sensors ──▶ apply valid readings
//!        │
//!        ▼
//!  SafetyVent::evaluate ── Trip ──▶ fan 100 %, close valve, stop
//!        │
//!        ├─ Hold ──▶ fan unchanged (100 %)
//!        ├─ Clear / Idle ──▶ fan 0 %
//!        ▼
//!  valve decision (need = co2 < setpoint), skipped until a valid CO2 reading exists
//!     need ∧ closed ∧ cooldown over ──▶ open, arm auto-close
//!     need ∧ open                   ──▶ leave it to the timer
//!     ¬need ∧ open                  ──▶ close, disarm
//! ```
//!
//! The fan is binary: off, or full-blast while the vent is latched.

use log::{debug, error, warn};

use crate::app::ports::{ActuatorPort, SensorPort, SetpointStore, ValveTimer};
use crate::config::SystemConfig;
use crate::error::{ActuatorError, StorageError};
use crate::safety::{SafetyVent, VentDecision};
use crate::sensors::{SensorFault, SensorReading, SensorSnapshot};

use super::valve::SharedValve;
use super::ControlState;

/// What the valve logic did this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValveAction {
    /// Nothing to do.
    Unchanged,
    /// Opened and auto-close armed.
    Opened,
    /// Already open and still needed; the auto-close timer owns it.
    HeldOpen,
    /// Setpoint reached while open.
    Closed,
    /// Forced closed by the safety vent.
    SafetyClosed,
    /// Needed, but the last close was too recent.
    CoolingDown { remaining_ms: u64 },
    /// The valve output or its timer failed.
    Fault(ActuatorError),
}

/// Outcome of one [`Controller::update`].
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub vent: VentDecision,
    pub valve: ValveAction,
    pub faults: heapless::Vec<SensorFault, 3>,
}

pub struct Controller {
    setpoint: f32,
    co2: f32,
    /// Set once the first valid CO2 reading is applied.
    co2_known: bool,
    temperature: f32,
    humidity: f32,
    pressure: f32,
    fan_speed: f32,
    vent: SafetyVent,
    valve: SharedValve,
    timer: Box<dyn ValveTimer + Send>,
    cooldown_ms: u32,
    max_open_ms: u32,
}

impl Controller {
    pub fn new(config: &SystemConfig, valve: SharedValve, timer: Box<dyn ValveTimer + Send>) -> Self {
        Self {
            setpoint: config.default_setpoint_ppm,
            co2: 0.0,
            co2_known: false,
            temperature: 0.0,
            humidity: 0.0,
            pressure: 0.0,
            fan_speed: 0.0,
            vent: SafetyVent::new(config.safety_threshold_ppm),
            valve,
            timer,
            cooldown_ms: config.valve_cooldown_ms,
            max_open_ms: config.valve_max_open_ms,
        }
    }

    /// Run one control cycle.
    pub fn update(&mut self, hw: &mut (impl SensorPort + ActuatorPort), now_ms: u64) -> CycleReport {
        let snapshot = hw.sample(now_ms);
        self.apply(&snapshot);

        let vent = self.vent.evaluate(self.co2, self.setpoint);
        if let Some(percent) = vent.fan_percent() {
            hw.set_fan_speed(percent);
        }
        self.fan_speed = hw.fan_speed();

        let valve = if vent == VentDecision::Trip {
            self.force_close(now_ms)
        } else {
            self.regulate(now_ms)
        };

        CycleReport {
            vent,
            valve,
            faults: snapshot.faults,
        }
    }

    /// Apply a new setpoint and persist it.
    ///
    /// The value is taken as given; range policy belongs to the caller.
    /// A failed write leaves the new setpoint in effect.
    pub fn set_setpoint(&mut self, value: f32, store: &mut impl SetpointStore) -> Result<(), StorageError> {
        self.setpoint = value;
        store.store(Self::stored_value(value))
    }

    /// Boot restore: take a setpoint that came from the store without
    /// writing it back.
    pub fn restore_setpoint(&mut self, value: f32) {
        self.setpoint = value;
    }

    /// The setpoint as written to the store.
    pub fn stored_value(setpoint: f32) -> u16 {
        setpoint.round() as u16
    }

    pub fn setpoint(&self) -> f32 {
        self.setpoint
    }

    pub fn co2(&self) -> f32 {
        self.co2
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn humidity(&self) -> f32 {
        self.humidity
    }

    pub fn pressure(&self) -> f32 {
        self.pressure
    }

    pub fn fan_speed(&self) -> f32 {
        self.fan_speed
    }

    pub fn valve_open(&self) -> bool {
        self.valve.is_open()
    }

    pub fn safety_override_active(&self) -> bool {
        self.vent.is_active()
    }

    pub fn valve_open_since_ms(&self) -> Option<u64> {
        self.valve.lock().open_since_ms()
    }

    pub fn valve_last_closed_at_ms(&self) -> Option<u64> {
        self.valve.lock().last_closed_at_ms()
    }

    /// Copy of every field, taken under one valve lock.
    pub fn state(&self) -> ControlState {
        let valve = self.valve.lock();
        ControlState {
            co2_setpoint: self.setpoint,
            current_co2: self.co2,
            current_temperature: self.temperature,
            current_humidity: self.humidity,
            current_pressure: self.pressure,
            current_fan_speed: self.fan_speed,
            valve_open: valve.is_open(),
            safety_override_active: self.vent.is_active(),
            valve_open_since_ms: valve.open_since_ms(),
            valve_last_closed_at_ms: valve.last_closed_at_ms(),
        }
    }

    // ── internals ────────────────────────────────────────────

    fn apply(&mut self, snapshot: &SensorSnapshot) {
        fn take(target: &mut f32, reading: Option<SensorReading>) {
            if let Some(r) = reading.filter(|r| r.valid) {
                *target = r.value;
            }
        }
        if snapshot.co2.is_some_and(|r| r.valid) {
            self.co2_known = true;
        }
        take(&mut self.co2, snapshot.co2);
        take(&mut self.temperature, snapshot.temperature);
        take(&mut self.humidity, snapshot.humidity);
        take(&mut self.pressure, snapshot.pressure);
    }

    fn force_close(&mut self, now_ms: u64) -> ValveAction {
        let result = self.valve.lock().close(now_ms);
        match result {
            Ok(true) => {
                self.disarm_auto_close();
                ValveAction::SafetyClosed
            }
            Ok(false) => ValveAction::Unchanged,
            Err(e) => {
                error!("VALVE | safety close failed: {}", e);
                ValveAction::Fault(e)
            }
        }
    }

    fn regulate(&mut self, now_ms: u64) -> ValveAction {
        if !self.co2_known {
            debug!("VALVE | no valid CO2 reading yet, holding closed");
            return ValveAction::Unchanged;
        }
        let need = self.co2 < self.setpoint;
        let mut valve = self.valve.lock();

        match (need, valve.is_open()) {
            (true, true) => ValveAction::HeldOpen,
            (false, false) => ValveAction::Unchanged,
            (true, false) => {
                if let Some(remaining_ms) = valve.cooldown_remaining(now_ms, self.cooldown_ms) {
                    debug!("VALVE | cooldown, {} ms remaining", remaining_ms);
                    return ValveAction::CoolingDown { remaining_ms };
                }
                if let Err(e) = valve.open(now_ms) {
                    warn!("VALVE | open failed: {}", e);
                    return ValveAction::Fault(e);
                }
                drop(valve);
                self.arm_auto_close(now_ms)
            }
            (false, true) => {
                let result = valve.close(now_ms);
                drop(valve);
                match result {
                    Ok(_) => {
                        self.disarm_auto_close();
                        ValveAction::Closed
                    }
                    Err(e) => {
                        warn!("VALVE | close failed: {}", e);
                        ValveAction::Fault(e)
                    }
                }
            }
        }
    }

    /// Arm the auto-close timer. The valve never stays open without it.
    fn arm_auto_close(&mut self, now_ms: u64) -> ValveAction {
        match self.timer.arm(self.max_open_ms) {
            Ok(()) => ValveAction::Opened,
            Err(e) => {
                error!("VALVE | auto-close timer unavailable ({}), closing", e);
                if let Err(close_err) = self.valve.lock().close(now_ms) {
                    error!("VALVE | close after timer failure failed: {}", close_err);
                }
                ValveAction::Fault(e)
            }
        }
    }

    fn disarm_auto_close(&mut self) {
        if let Err(e) = self.timer.disarm() {
            warn!("VALVE | auto-close disarm failed: {}", e);
        }
    }
}
