use chrono::NaiveTime;

use crate::command::{Backlight, Command};
use crate::display::LCD_COLUMNS;
use crate::marquee::Marquee;

pub const STATUS_BANNER: &str = "Hello Eric.. https://github.com/electronf99/eric-LCD-BT-thingy ";

/// Companion-side generator: scrolling banner on row 0, wall clock on row 1.
pub struct StatusFrame {
    marquee: Marquee,
    backlight: Backlight,
}

impl StatusFrame {
    #[must_use]
    pub fn new(banner: &str, backlight: Backlight) -> Self {
        Self {
            marquee: Marquee::new(banner, usize::from(LCD_COLUMNS)),
            backlight,
        }
    }

    pub fn next_command(&mut self, now: NaiveTime) -> Command {
        Command {
            backlight: Some(self.backlight),
            row0: Some(self.marquee.advance()),
            row1: Some(now.format("%H:%M:%S").to_string()),
        }
    }
}

impl Default for StatusFrame {
    fn default() -> Self {
        Self::new(STATUS_BANNER, Backlight::On)
    }
}
