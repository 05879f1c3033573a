//! Safety vent supervisor.
//!
//! The supervisor runs **every control cycle before the valve decision**
//! and owns the latched override flag. It has two regimes:
//!
//! 1. CO2 above the safety threshold trips the vent: the fan goes to
//!    100 %, the valve is forced closed and the cycle ends there.
//! 2. Once tripped, the vent stays latched (fan held at 100 %) until CO2
//!    falls to or below the setpoint. Only then does the fan return to 0.
//!
//! The gap between the setpoint and the threshold is the hysteresis band:
//! a reading in `(setpoint, threshold]` changes nothing.

use log::{error, info};

/// Result of evaluating one reading against the vent rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VentDecision {
    /// Above the threshold: fan 100 %, valve closed, skip the rest of the cycle.
    Trip,
    /// Latched and still above the setpoint: fan stays at 100 %.
    Hold,
    /// Latched, and CO2 just fell to the setpoint: fan back to 0 %.
    Clear,
    /// Not latched: fan at 0 %.
    Idle,
}

impl VentDecision {
    /// Fan command implied by this decision, `None` when the fan is left as is.
    pub fn fan_percent(self) -> Option<f32> {
        match self {
            Self::Trip => Some(100.0),
            Self::Hold => None,
            Self::Clear | Self::Idle => Some(0.0),
        }
    }
}

/// Latched over-concentration supervisor.
pub struct SafetyVent {
    threshold_ppm: f32,
    active: bool,
}

impl SafetyVent {
    pub fn new(threshold_ppm: f32) -> Self {
        Self {
            threshold_ppm,
            active: false,
        }
    }

    /// Evaluate the latest CO2 value against the threshold and the setpoint.
    pub fn evaluate(&mut self, co2_ppm: f32, setpoint_ppm: f32) -> VentDecision {
        if co2_ppm > self.threshold_ppm {
            if !self.active {
                error!(
                    "SAFETY VENT ENGAGED: CO2 {:.0} ppm > {:.0} ppm",
                    co2_ppm, self.threshold_ppm
                );
            }
            self.active = true;
            return VentDecision::Trip;
        }

        if !self.active {
            return VentDecision::Idle;
        }

        if co2_ppm <= setpoint_ppm {
            info!(
                "SAFETY VENT CLEARED: CO2 {:.0} ppm <= setpoint {:.0} ppm",
                co2_ppm, setpoint_ppm
            );
            self.active = false;
            return VentDecision::Clear;
        }

        VentDecision::Hold
    }

    /// True while the override is latched.
    pub fn is_active(&self) -> bool {
        self.active
    }
}
