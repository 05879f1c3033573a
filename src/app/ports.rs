//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService / Controller (domain)
//! ```
//!
//! Driven adapters (sensors, fan, valve, auto-close timer, setpoint store,
//! display, event sinks) implement these traits. The domain consumes them
//! via generics or boxed trait objects, so the control core never touches
//! hardware directly and runs unchanged against host mocks.

use crate::error::{ActuatorError, StorageError};
use crate::events::Event;
use crate::sensors::SensorSnapshot;
use crate::ui::screen::Screen;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the controller calls this once per cycle.
pub trait SensorPort {
    /// Sample every fitted sensor. Failed readings come back marked
    /// invalid, never zeroed.
    fn sample(&mut self, now_ms: u64) -> SensorSnapshot;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Fan side of the actuators. The valve lives behind [`ValveOutput`]
/// because the auto-close timer drives it from another context.
pub trait ActuatorPort {
    /// Command the fan, percent clamped to [0, 100]. A failed write is
    /// logged by the adapter and not reported here.
    fn set_fan_speed(&mut self, percent: f32);

    /// Last commanded fan speed (percent).
    fn fan_speed(&self) -> f32;
}

/// Binary valve output.
pub trait ValveOutput {
    fn set_open(&mut self, open: bool) -> Result<(), ActuatorError>;
}

/// One-shot timer that closes the valve after its maximum open time.
///
/// Arming an armed timer restarts it. The expiry runs outside the
/// control cycle and calls [`SharedValve::expire`](crate::control::valve::SharedValve::expire).
pub trait ValveTimer {
    fn arm(&mut self, after_ms: u32) -> Result<(), ActuatorError>;

    /// Cancel a pending expiry. Disarming an idle timer is not an error.
    fn disarm(&mut self) -> Result<(), ActuatorError>;
}

// ───────────────────────────────────────────────────────────────
// Setpoint store (driven adapter: domain ↔ EEPROM)
// ───────────────────────────────────────────────────────────────

/// Single fixed slot holding the CO2 setpoint.
pub trait SetpointStore {
    fn load(&mut self) -> Result<u16, StorageError>;

    fn store(&mut self, value: u16) -> Result<(), StorageError>;
}

/// A store that failed to construct at boot behaves as permanently
/// unavailable.
impl<T: SetpointStore> SetpointStore for Option<T> {
    fn load(&mut self) -> Result<u16, StorageError> {
        match self {
            Some(inner) => inner.load(),
            None => Err(StorageError::Unavailable),
        }
    }

    fn store(&mut self, value: u16) -> Result<(), StorageError> {
        match self {
            Some(inner) => inner.store(value),
            None => Err(StorageError::Unavailable),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port. Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Display port
// ───────────────────────────────────────────────────────────────

/// Renders a composed [`Screen`].
pub trait DisplayPort {
    fn show(&mut self, screen: &Screen);
}

// ───────────────────────────────────────────────────────────────
// Clock
// ───────────────────────────────────────────────────────────────

/// Monotonic milliseconds since boot.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Scheduler delegate (decouples scheduler from event queue)
// ───────────────────────────────────────────────────────────────

/// Callback the [`TickScheduler`](crate::scheduler::TickScheduler) invokes
/// when an activity falls due. The scheduler knows nothing about queues.
pub trait SchedulerDelegate {
    fn on_due(&mut self, event: Event);
}
