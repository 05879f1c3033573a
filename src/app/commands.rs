//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (the rotary
//! UI, the telemetry response parser) that the
//! [`AppService`](super::service::AppService) interprets and acts upon.

/// Where a setpoint command came from. Decides the range policy:
/// local values are clamped, remote values outside the range are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandSource {
    /// Rotary encoder edit mode.
    Local,
    /// `SETPOINT=` token in a telemetry response.
    Remote,
}

impl CommandSource {
    pub fn label(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
        }
    }
}

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppCommand {
    /// Replace the CO2 setpoint (ppm) and persist it.
    SetSetpoint { value: f32, source: CommandSource },
}
