//! Mock adapters for integration tests.
//!
//! Every mock records what the core asked of it, so tests can assert on
//! the full command history without real Modbus, GPIO or EEPROM.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use greenhouse::app::events::AppEvent;
use greenhouse::app::ports::{ActuatorPort, EventSink, SensorPort, SetpointStore, ValveOutput, ValveTimer};
use greenhouse::app::service::AppService;
use greenhouse::config::SystemConfig;
use greenhouse::control::valve::SharedValve;
use greenhouse::error::{ActuatorError, SensorError, StorageError, TransportError};
use greenhouse::sensors::{SensorFault, SensorKind, SensorReading, SensorSnapshot};

// ── Sensors + fan ─────────────────────────────────────────────

/// Scripted sensor values. `None` simulates a failed acquisition.
pub struct MockHardware {
    pub co2: Option<f32>,
    pub temperature: Option<f32>,
    pub humidity: Option<f32>,
    pub fan_commands: Vec<f32>,
    fan: f32,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self {
            co2: Some(1000.0),
            temperature: Some(21.0),
            humidity: Some(60.0),
            fan_commands: Vec::new(),
            fan: 0.0,
        }
    }

    pub fn with_co2(co2: f32) -> Self {
        Self { co2: Some(co2), ..Self::new() }
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

fn reading(value: Option<f32>) -> SensorReading {
    value.map_or(SensorReading::stale(0.0), SensorReading::fresh)
}

impl SensorPort for MockHardware {
    fn sample(&mut self, _now_ms: u64) -> SensorSnapshot {
        let mut snap = SensorSnapshot {
            co2: Some(reading(self.co2)),
            temperature: Some(reading(self.temperature)),
            humidity: Some(reading(self.humidity)),
            pressure: None,
            faults: heapless::Vec::new(),
        };
        let timeout = SensorError::Transport(TransportError::Timeout);
        if self.co2.is_none() {
            let _ = snap.faults.push(SensorFault { kind: SensorKind::Co2, error: timeout });
        }
        if self.temperature.is_none() || self.humidity.is_none() {
            let _ = snap.faults.push(SensorFault { kind: SensorKind::TempRh, error: timeout });
        }
        snap
    }
}

impl ActuatorPort for MockHardware {
    fn set_fan_speed(&mut self, percent: f32) {
        self.fan = percent.clamp(0.0, 100.0);
        self.fan_commands.push(self.fan);
    }

    fn fan_speed(&self) -> f32 {
        self.fan
    }
}

// ── Valve output ──────────────────────────────────────────────

/// Records every level written; can be told to fail.
#[derive(Clone, Default)]
pub struct RecordingValve {
    pub writes: Arc<Mutex<Vec<bool>>>,
    pub broken: Arc<AtomicBool>,
}

#[allow(dead_code)]
impl RecordingValve {
    pub fn writes(&self) -> Vec<bool> {
        self.writes.lock().unwrap().clone()
    }

    pub fn break_output(&self) {
        self.broken.store(true, Ordering::SeqCst);
    }
}

impl ValveOutput for RecordingValve {
    fn set_open(&mut self, open: bool) -> Result<(), ActuatorError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(ActuatorError::GpioWriteFailed);
        }
        self.writes.lock().unwrap().push(open);
        Ok(())
    }
}

// ── Auto-close timer ──────────────────────────────────────────

/// A timer that never fires by itself. Tests check what was armed and
/// call `SharedValve::expire` to simulate the expiry.
#[derive(Clone, Default)]
pub struct ManualTimer {
    pub armed: Arc<Mutex<Option<u32>>>,
    pub arms: Arc<Mutex<u32>>,
}

#[allow(dead_code)]
impl ManualTimer {
    pub fn armed_for(&self) -> Option<u32> {
        *self.armed.lock().unwrap()
    }

    pub fn arm_count(&self) -> u32 {
        *self.arms.lock().unwrap()
    }
}

impl ValveTimer for ManualTimer {
    fn arm(&mut self, after_ms: u32) -> Result<(), ActuatorError> {
        *self.armed.lock().unwrap() = Some(after_ms);
        *self.arms.lock().unwrap() += 1;
        Ok(())
    }

    fn disarm(&mut self) -> Result<(), ActuatorError> {
        *self.armed.lock().unwrap() = None;
        Ok(())
    }
}

// ── Setpoint store ────────────────────────────────────────────

/// In-memory slot. `slot == None` reads as an erased part.
#[derive(Default)]
pub struct MemStore {
    pub slot: Option<u16>,
    pub fail_reads: bool,
    pub fail_writes: bool,
    pub writes: Vec<u16>,
}

#[allow(dead_code)]
impl MemStore {
    pub fn holding(value: u16) -> Self {
        Self { slot: Some(value), ..Self::default() }
    }
}

impl SetpointStore for MemStore {
    fn load(&mut self) -> Result<u16, StorageError> {
        if self.fail_reads {
            return Err(StorageError::Transport(TransportError::NoDevice));
        }
        self.slot.ok_or(StorageError::Blank)
    }

    fn store(&mut self, value: u16) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::Transport(TransportError::NoDevice));
        }
        self.slot = Some(value);
        self.writes.push(value);
        Ok(())
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Assembled rig ─────────────────────────────────────────────

pub struct Rig {
    pub app: AppService,
    pub valve: SharedValve,
    pub output: RecordingValve,
    pub timer: ManualTimer,
    pub hw: MockHardware,
    pub store: MemStore,
    pub sink: RecordingSink,
}

#[allow(dead_code)]
impl Rig {
    pub fn new(store: MemStore) -> Self {
        Self::with_config(&SystemConfig::default(), store)
    }

    pub fn with_config(config: &SystemConfig, store: MemStore) -> Self {
        let output = RecordingValve::default();
        let timer = ManualTimer::default();
        let valve = SharedValve::new(output.clone());
        let app = AppService::new(config, valve.clone(), Box::new(timer.clone()));
        Self {
            app,
            valve,
            output,
            timer,
            hw: MockHardware::new(),
            store,
            sink: RecordingSink::default(),
        }
    }

    /// Restore the setpoint and return it.
    pub fn start(&mut self) -> f32 {
        self.app.start(&mut self.store, &mut self.sink)
    }

    /// One control cycle with the given CO2 reading.
    pub fn cycle(&mut self, co2: f32, now_ms: u64) {
        self.hw.co2 = Some(co2);
        self.app.tick(&mut self.hw, now_ms, &mut self.sink);
    }
}
