//! Composed screen frames for the 128×64 status display.
//!
//! A [`Screen`] is a list of positioned text runs, independent of any
//! pixel driver. The [`DisplayPort`](crate::app::ports::DisplayPort)
//! adapter decides how to render it.

use core::fmt::{self, Write};

/// Longest text run that fits one row at scale 1.
pub const LINE_CAP: usize = 24;
/// Most text runs on one frame.
pub const MAX_LINES: usize = 6;

/// One text run at pixel position (`x`, `y`), font scale 1 or 2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLine {
    pub x: u8,
    pub y: u8,
    pub scale: u8,
    pub text: heapless::String<LINE_CAP>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Screen {
    lines: heapless::Vec<TextLine, MAX_LINES>,
}

impl Screen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a formatted run. Text past [`LINE_CAP`] is cut; runs past
    /// [`MAX_LINES`] are dropped.
    pub fn text(&mut self, x: u8, y: u8, scale: u8, args: fmt::Arguments<'_>) -> &mut Self {
        let mut text = Truncating(heapless::String::new());
        // Truncating never reports an error.
        let _ = text.write_fmt(args);
        let _ = self.lines.push(TextLine { x, y, scale, text: text.0 });
        self
    }

    pub fn lines(&self) -> &[TextLine] {
        &self.lines
    }

    /// True if any run contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|l| l.text.contains(needle))
    }
}

/// Writes as much as fits, then silently stops.
struct Truncating(heapless::String<LINE_CAP>);

impl Write for Truncating {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            if self.0.push(c).is_err() {
                break;
            }
        }
        Ok(())
    }
}
