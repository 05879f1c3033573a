//! Local user interface: rotary edit mode and screen composition.
//!
//! ```text
//!            press                       press (commit)
//!  Normal ────────────▶ Editing ────────────────────────▶ Normal + "Saved!"
//!    ▲                   │  turn: ±step, clamped [0, max]
//!    └── follows controller setpoint while not editing
//! ```
//!
//! The UI never calls the controller. A commit comes back from
//! [`UiState::on_press`] and the main loop turns it into a local
//! `SetSetpoint` command.

pub mod screen;

use log::{debug, info};

use crate::config::SystemConfig;
use crate::control::ControlState;
use screen::Screen;

/// Bound of the raw local setter, looser than the edit-mode bound.
pub const RAW_SETPOINT_LIMIT: f32 = 3000.0;

pub struct UiState {
    editing: bool,
    local_setpoint: f32,
    step_ppm: f32,
    max_setpoint: f32,
    press_debounce_ms: u32,
    last_press_ms: Option<u32>,
    saved_banner_refreshes: u8,
    saved_banner_left: u8,
}

impl UiState {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            editing: false,
            local_setpoint: config.default_setpoint_ppm,
            step_ppm: config.ui_step_ppm,
            max_setpoint: config.max_setpoint_ppm,
            press_debounce_ms: config.ui_press_debounce_ms,
            last_press_ms: None,
            saved_banner_refreshes: config.ui_saved_banner_refreshes,
            saved_banner_left: 0,
        }
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    pub fn local_setpoint(&self) -> f32 {
        self.local_setpoint
    }

    /// Seed the pending value (boot restore), clamped to [0, 3000].
    pub fn set_local_setpoint(&mut self, setpoint: f32) {
        self.local_setpoint = setpoint.clamp(0.0, RAW_SETPOINT_LIMIT);
    }

    /// One or more encoder detents. Ignored outside edit mode.
    pub fn on_turn(&mut self, detents: i32) {
        if !self.editing {
            return;
        }
        let next = self.local_setpoint + detents as f32 * self.step_ppm;
        self.local_setpoint = next.clamp(0.0, self.max_setpoint);
        debug!("UI: pending setpoint {:.0}", self.local_setpoint);
    }

    /// Toggle edit mode. Leaving edit mode returns the value to commit.
    pub fn on_press(&mut self, now_ms: u32) -> Option<f32> {
        if let Some(last) = self.last_press_ms {
            if now_ms.wrapping_sub(last) < self.press_debounce_ms {
                debug!("UI: press ignored ({} ms after last)", now_ms.wrapping_sub(last));
                return None;
            }
        }
        self.last_press_ms = Some(now_ms);

        self.editing = !self.editing;
        info!("UI: edit mode {}", if self.editing { "ON" } else { "OFF" });
        if self.editing {
            return None;
        }
        self.saved_banner_left = self.saved_banner_refreshes;
        Some(self.local_setpoint)
    }

    /// Compose the next frame. Outside edit mode the pending value follows
    /// the controller, so remote changes show up.
    pub fn refresh(&mut self, state: &ControlState) -> Screen {
        if !self.editing {
            self.local_setpoint = state.co2_setpoint;
        }

        let mut screen = Screen::new();
        if self.editing {
            screen
                .text(0, 0, 2, format_args!("Edit Setpoint:"))
                .text(0, 20, 2, format_args!("{:.1} ppm", self.local_setpoint))
                .text(0, 45, 1, format_args!("Turn to adjust"))
                .text(0, 55, 1, format_args!("Press to save"));
            return screen;
        }

        screen
            .text(0, 0, 2, format_args!("CO2: {:.1} ppm", state.current_co2))
            .text(
                0,
                16,
                1,
                format_args!("T:{:.1}C  RH:{:.1}%", state.current_temperature, state.current_humidity),
            )
            .text(0, 26, 1, format_args!("Fan: {:.0}%", state.current_fan_speed))
            .text(
                0,
                36,
                1,
                format_args!("Valve: {}", if state.valve_open { "OPEN" } else { "CLOSED" }),
            )
            .text(0, 46, 2, format_args!("Set: {:.1} ppm", self.local_setpoint));
        if self.saved_banner_left > 0 {
            screen.text(90, 58, 1, format_args!("Saved!"));
            self.saved_banner_left -= 1;
        }
        screen
    }

    /// Boot splash.
    pub fn splash() -> Screen {
        let mut screen = Screen::new();
        screen
            .text(0, 0, 1, format_args!("Greenhouse UI"))
            .text(0, 10, 1, format_args!("Starting..."));
        screen
    }
}
