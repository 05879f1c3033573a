//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (UART / USB-CDC in production). One line per event,
//! each starting with a subsystem tag.

use log::{debug, error, info, warn};

use crate::app::events::{AppEvent, CloseReason, SetpointOrigin};
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { setpoint, origin } => match origin {
                SetpointOrigin::Stored => info!("CTRL | started, setpoint {:.0} ppm (stored)", setpoint),
                SetpointOrigin::Default => {
                    info!("CTRL | started, setpoint {:.0} ppm (no store, default)", setpoint);
                }
                SetpointOrigin::Fallback(e) => {
                    warn!("CTRL | started, setpoint {:.0} ppm (store {}, fallback)", setpoint, e);
                }
            },
            AppEvent::Cycle(s) => {
                info!(
                    "CTRL | CO2={:.1}/{:.1}ppm | T={:.1}\u{00b0}C RH={:.1}% | P={:.1}Pa | \
                     fan={:.0}% | valve={} | vent={}",
                    s.current_co2,
                    s.co2_setpoint,
                    s.current_temperature,
                    s.current_humidity,
                    s.current_pressure,
                    s.current_fan_speed,
                    if s.valve_open { "OPEN" } else { "CLOSED" },
                    if s.safety_override_active { "ON" } else { "off" },
                );
            }
            AppEvent::ValveOpened => info!("VALVE | opened"),
            AppEvent::ValveClosed { reason: CloseReason::SetpointReached } => {
                info!("VALVE | closed, setpoint reached");
            }
            AppEvent::ValveClosed { reason: CloseReason::SafetyVent } => {
                warn!("VALVE | forced closed by safety vent");
            }
            AppEvent::ValveCooldown { remaining_ms } => {
                debug!("VALVE | cooling down, {} ms left", remaining_ms);
            }
            AppEvent::ValveFault(e) => error!("VALVE | {}", e),
            AppEvent::VentEngaged { co2 } => warn!("VENT | engaged at {:.0} ppm, fan 100%", co2),
            AppEvent::VentCleared { co2 } => info!("VENT | cleared at {:.0} ppm, fan off", co2),
            AppEvent::SensorFault(f) => warn!("SENSOR | {}: {}", f.kind.label(), f.error),
            AppEvent::SetpointChanged { value, source } => {
                info!("SETPOINT | {:.1} ppm ({})", value, source.label());
            }
            AppEvent::SetpointRejected { value, source, reason } => {
                warn!("SETPOINT | rejected {:.2} ({}): {}", value, source.label(), reason);
            }
            AppEvent::StoreWriteFailed(e) => warn!("STORE | write failed: {}", e),
            AppEvent::StoreResynced { value } => info!("STORE | rewrote stored setpoint {}", value),
        }
    }
}
