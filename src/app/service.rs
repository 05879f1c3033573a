//! Application service — the hexagonal core.
//!
//! [`AppService`] owns the [`Controller`] and the setpoint policy around
//! it: boot restore, range checks per command source, persistence and
//! its periodic repair. All I/O flows through port traits injected at
//! call sites, making the whole service testable with mock adapters.
//!
//! ```text
//!  SensorPort ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!                 │        AppService         │
//! ActuatorPort ◀──│  Controller · SafetyVent  │◀── AppCommand
//!                 └────────────┬─────────────┘
//!                              ▼
//!                        SetpointStore
//! ```

use log::{debug, info, warn};

use crate::config::SystemConfig;
use crate::control::controller::{Controller, ValveAction};
use crate::control::valve::SharedValve;
use crate::control::ControlState;
use crate::error::{RangeViolation, StorageError};
use crate::safety::VentDecision;

use super::commands::{AppCommand, CommandSource};
use super::events::{AppEvent, CloseReason, SetpointOrigin, TelemetrySample};
use super::ports::{ActuatorPort, EventSink, SensorPort, SetpointStore, ValveTimer};

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

pub struct AppService {
    controller: Controller,
    max_setpoint: f32,
    default_setpoint: f32,
    store_fallback: u16,
    /// The last setpoint write failed; maintenance retries it.
    persist_pending: bool,
    cycles: u64,
}

impl AppService {
    /// Construct the service. Call [`start`](Self::start) before the first tick.
    pub fn new(config: &SystemConfig, valve: SharedValve, timer: Box<dyn ValveTimer + Send>) -> Self {
        Self {
            controller: Controller::new(config, valve, timer),
            max_setpoint: config.max_setpoint_ppm,
            default_setpoint: config.default_setpoint_ppm,
            store_fallback: config.store_fallback_ppm,
            persist_pending: false,
            cycles: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Restore the setpoint from the store and return it, so the caller
    /// can seed the UI with the same value.
    ///
    /// An unreadable slot yields the store fallback; a missing store
    /// yields the configured default. Neither is written back here:
    /// store maintenance repairs the slot later.
    pub fn start(&mut self, store: &mut impl SetpointStore, sink: &mut impl EventSink) -> f32 {
        let (setpoint, origin) = match store.load() {
            Ok(raw) => (f32::from(raw), SetpointOrigin::Stored),
            Err(StorageError::Unavailable) => (self.default_setpoint, SetpointOrigin::Default),
            Err(e) => (f32::from(self.store_fallback), SetpointOrigin::Fallback(e)),
        };
        self.controller.restore_setpoint(setpoint);
        info!("AppService started, setpoint {:.0} ppm ({:?})", setpoint, origin);
        sink.emit(&AppEvent::Started { setpoint, origin });
        setpoint
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one control cycle and report what happened.
    ///
    /// The `hw` parameter satisfies **both** [`SensorPort`] and
    /// [`ActuatorPort`], which avoids a double mutable borrow while
    /// keeping the port boundary explicit.
    pub fn tick(&mut self, hw: &mut (impl SensorPort + ActuatorPort), now_ms: u64, sink: &mut impl EventSink) {
        self.cycles += 1;
        let was_venting = self.controller.safety_override_active();
        let report = self.controller.update(hw, now_ms);

        for fault in &report.faults {
            sink.emit(&AppEvent::SensorFault(*fault));
        }

        let co2 = self.controller.co2();
        match report.vent {
            VentDecision::Trip if !was_venting => sink.emit(&AppEvent::VentEngaged { co2 }),
            VentDecision::Clear => sink.emit(&AppEvent::VentCleared { co2 }),
            _ => {}
        }

        match report.valve {
            ValveAction::Opened => sink.emit(&AppEvent::ValveOpened),
            ValveAction::Closed => sink.emit(&AppEvent::ValveClosed {
                reason: CloseReason::SetpointReached,
            }),
            ValveAction::SafetyClosed => sink.emit(&AppEvent::ValveClosed {
                reason: CloseReason::SafetyVent,
            }),
            ValveAction::CoolingDown { remaining_ms } => {
                sink.emit(&AppEvent::ValveCooldown { remaining_ms })
            }
            ValveAction::Fault(e) => sink.emit(&AppEvent::ValveFault(e)),
            ValveAction::Unchanged | ValveAction::HeldOpen => {}
        }

        sink.emit(&AppEvent::Cycle(self.controller.state()));
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an external command (rotary UI or telemetry response).
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        store: &mut impl SetpointStore,
        sink: &mut impl EventSink,
    ) {
        match cmd {
            AppCommand::SetSetpoint { value, source } => match self.admit(value, source) {
                Ok(accepted) => self.apply_setpoint(accepted, source, store, sink),
                Err(reason) => {
                    warn!(
                        "Setpoint {} from {} rejected: {}",
                        value,
                        source.label(),
                        reason
                    );
                    sink.emit(&AppEvent::SetpointRejected { value, source, reason });
                }
            },
        }
    }

    /// Range policy: remote values must lie in `(0, max]` or are dropped;
    /// local values are clamped to `[0, max]`.
    fn admit(&self, value: f32, source: CommandSource) -> Result<f32, RangeViolation> {
        if value.is_nan() {
            return Err(RangeViolation::NotANumber);
        }
        match source {
            CommandSource::Local => Ok(value.clamp(0.0, self.max_setpoint)),
            CommandSource::Remote => {
                if value <= 0.0 {
                    Err(RangeViolation::BelowMinimum)
                } else if value > self.max_setpoint {
                    Err(RangeViolation::AboveMaximum)
                } else {
                    Ok(value)
                }
            }
        }
    }

    fn apply_setpoint(
        &mut self,
        value: f32,
        source: CommandSource,
        store: &mut impl SetpointStore,
        sink: &mut impl EventSink,
    ) {
        match self.controller.set_setpoint(value, store) {
            Ok(()) => self.persist_pending = false,
            Err(e) => {
                warn!("Setpoint {:.0} not persisted: {}", value, e);
                self.persist_pending = true;
                sink.emit(&AppEvent::StoreWriteFailed(e));
            }
        }
        info!("Setpoint -> {:.0} ppm ({})", value, source.label());
        sink.emit(&AppEvent::SetpointChanged { value, source });
    }

    // ── Persistence maintenance ───────────────────────────────

    /// Re-read the stored setpoint and rewrite it if it differs from the
    /// in-memory value or a previous write failed.
    pub fn maintain_store(&mut self, store: &mut impl SetpointStore, sink: &mut impl EventSink) {
        let wanted = Controller::stored_value(self.controller.setpoint());
        match store.load() {
            Err(StorageError::Unavailable) => {
                debug!("Store maintenance skipped: no store");
                return;
            }
            Ok(stored) if stored == wanted && !self.persist_pending => {
                debug!("Store in sync ({})", stored);
                return;
            }
            Ok(stored) => debug!("Store holds {}, want {}", stored, wanted),
            Err(e) => warn!("Store read failed during maintenance: {}", e),
        }

        match store.store(wanted) {
            Ok(()) => {
                self.persist_pending = false;
                sink.emit(&AppEvent::StoreResynced { value: wanted });
            }
            Err(e) => {
                self.persist_pending = true;
                sink.emit(&AppEvent::StoreWriteFailed(e));
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn build_telemetry(&self) -> TelemetrySample {
        TelemetrySample {
            co2_ppm: self.controller.co2(),
            humidity_pct: self.controller.humidity(),
            temperature_c: self.controller.temperature(),
            fan_percent: self.controller.fan_speed(),
            setpoint_ppm: self.controller.setpoint(),
        }
    }

    pub fn state(&self) -> ControlState {
        self.controller.state()
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn persist_pending(&self) -> bool {
        self.persist_pending
    }

    /// Control cycles run since boot.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
