//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port. Adapters on the other
//! side decide what to do with them: the serial log on the device, a
//! recording vector in tests.

use crate::control::ControlState;
use crate::error::{ActuatorError, RangeViolation, StorageError};
use crate::sensors::SensorFault;

use super::commands::CommandSource;

/// Where the boot setpoint came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetpointOrigin {
    /// Read back from the store.
    Stored,
    /// The store could not be read; the documented fallback was used.
    Fallback(StorageError),
    /// No store is fitted; the configured default was used.
    Default,
}

/// Why the valve closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    SetpointReached,
    SafetyVent,
}

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The service has started with this setpoint.
    Started { setpoint: f32, origin: SetpointOrigin },

    /// Per-cycle diagnostic snapshot.
    Cycle(ControlState),

    ValveOpened,
    ValveClosed { reason: CloseReason },
    ValveCooldown { remaining_ms: u64 },
    ValveFault(ActuatorError),

    /// CO2 crossed the safety threshold; fan at 100 %.
    VentEngaged { co2: f32 },
    /// CO2 fell back to the setpoint; fan off.
    VentCleared { co2: f32 },

    SensorFault(SensorFault),

    SetpointChanged { value: f32, source: CommandSource },
    SetpointRejected { value: f32, source: CommandSource, reason: RangeViolation },

    /// The in-memory setpoint is in effect but could not be persisted.
    StoreWriteFailed(StorageError),
    /// Maintenance found the stored value stale and rewrote it.
    StoreResynced { value: u16 },
}

/// One telemetry upload's worth of values.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TelemetrySample {
    pub co2_ppm: f32,
    pub humidity_pct: f32,
    pub temperature_c: f32,
    pub fan_percent: f32,
    pub setpoint_ppm: f32,
}
