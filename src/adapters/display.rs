//! Log-backed display adapter.
//!
//! The OLED panel has no driver in this firmware yet; frames are mirrored
//! to the serial log instead. Only frames that differ from the previous
//! one are written, so a 1 Hz refresh of an unchanged screen stays quiet.

use log::info;

use crate::app::ports::DisplayPort;
use crate::ui::screen::Screen;

#[derive(Default)]
pub struct LogDisplay {
    last: Option<Screen>,
    frames: u32,
}

impl LogDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames actually written since boot.
    pub fn frames(&self) -> u32 {
        self.frames
    }
}

impl DisplayPort for LogDisplay {
    fn show(&mut self, screen: &Screen) {
        if self.last.as_ref() == Some(screen) {
            return;
        }
        for line in screen.lines() {
            info!("UI | ({:>3},{:>2}) x{} {}", line.x, line.y, line.scale, line.text);
        }
        self.frames = self.frames.wrapping_add(1);
        self.last = Some(screen.clone());
    }
}
