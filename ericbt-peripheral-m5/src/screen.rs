//! The M5StickC PLUS2 TFT pretending to be a 16x2 character LCD.

use embedded_graphics::mono_font::ascii::FONT_10X20;
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Baseline, Text};
use ericbt_domain::display::{CharacterDisplay, DisplayError, TextGrid};
use esp_idf_hal::gpio::{Gpio27, Output, PinDriver};

const CELL_WIDTH: u32 = 10;
const ROW_HEIGHT: u32 = 20;
const LEFT: i32 = 40;
const TOP: i32 = 40;
const ROW_GAP: u32 = 12;

pub struct LcdScreen<D> {
    target: D,
    grid: TextGrid,
    backlight: PinDriver<'static, Gpio27, Output>,
}

impl<D> LcdScreen<D>
where
    D: DrawTarget<Color = Rgb565>,
    D::Error: core::fmt::Debug,
{
    pub fn new(mut target: D, backlight: PinDriver<'static, Gpio27, Output>) -> Result<Self, DisplayError> {
        target.clear(Rgb565::BLACK).map_err(bus)?;
        Ok(Self {
            target,
            grid: TextGrid::default(),
            backlight,
        })
    }

    fn row_origin(row: u8) -> Point {
        let y = TOP + (u32::from(row) * (ROW_HEIGHT + ROW_GAP)) as i32;
        Point::new(LEFT, y)
    }

    /// Redraw every row the grid marked as changed.
    fn flush(&mut self) -> Result<(), DisplayError> {
        let style = MonoTextStyle::new(&FONT_10X20, Rgb565::WHITE);
        for row in self.grid.take_dirty_rows() {
            let origin = Self::row_origin(row);
            let width = CELL_WIDTH * u32::from(ericbt_domain::display::LCD_COLUMNS);
            Rectangle::new(origin, Size::new(width, ROW_HEIGHT))
                .into_styled(PrimitiveStyle::with_fill(Rgb565::BLACK))
                .draw(&mut self.target)
                .map_err(bus)?;
            Text::with_baseline(&self.grid.row_text(row), origin, style, Baseline::Top)
                .draw(&mut self.target)
                .map_err(bus)?;
        }
        Ok(())
    }
}

fn bus(e: impl core::fmt::Debug) -> DisplayError {
    DisplayError::Bus(format!("{e:?}"))
}

impl<D> CharacterDisplay for LcdScreen<D>
where
    D: DrawTarget<Color = Rgb565>,
    D::Error: core::fmt::Debug,
{
    fn clear(&mut self) -> Result<(), DisplayError> {
        self.grid.clear()?;
        self.flush()
    }

    fn move_to(&mut self, col: u8, row: u8) -> Result<(), DisplayError> {
        self.grid.move_to(col, row)
    }

    fn putstr(&mut self, text: &str) -> Result<(), DisplayError> {
        self.grid.putstr(text)?;
        self.flush()
    }

    fn backlight_on(&mut self) -> Result<(), DisplayError> {
        self.grid.backlight_on()?;
        self.backlight.set_high().map_err(bus)
    }

    fn backlight_off(&mut self) -> Result<(), DisplayError> {
        self.grid.backlight_off()?;
        self.backlight.set_low().map_err(bus)
    }
}
