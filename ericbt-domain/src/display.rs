//! Character display abstraction plus an in-memory text model for screens
//! that have to redraw whole rows.

use std::fmt;

pub const LCD_COLUMNS: u8 = 16;
pub const LCD_ROWS: u8 = 2;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DisplayError {
    OutOfBounds { col: u8, row: u8 },
    /// The underlying bus, pin or draw target failed
    Bus(String),
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayError::OutOfBounds { col, row } => {
                write!(f, "cursor position ({col}, {row}) is off screen")
            }
            DisplayError::Bus(msg) => write!(f, "display bus: {msg}"),
        }
    }
}

impl std::error::Error for DisplayError {}

/// What the command protocol needs from a display.
pub trait CharacterDisplay {
    fn clear(&mut self) -> Result<(), DisplayError>;
    fn move_to(&mut self, col: u8, row: u8) -> Result<(), DisplayError>;
    fn putstr(&mut self, text: &str) -> Result<(), DisplayError>;
    fn backlight_on(&mut self) -> Result<(), DisplayError>;
    fn backlight_off(&mut self) -> Result<(), DisplayError>;
}

/// HD44780-style character buffer.
///
/// Writing past the last column wraps to the start of the next row and the
/// last row wraps back to the first, like an I2C backpack LCD does. A newline
/// moves to the next row unless the cursor just wrapped there.
pub struct TextGrid {
    cols: u8,
    rows: u8,
    cells: Vec<Vec<char>>,
    dirty: Vec<bool>,
    cursor: (u8, u8),
    implied_newline: bool,
    backlight: bool,
}

impl TextGrid {
    /// A grid is at least one cell in each direction.
    #[must_use]
    pub fn new(cols: u8, rows: u8) -> Self {
        let cols = cols.max(1);
        let rows = rows.max(1);
        Self {
            cols,
            rows,
            cells: vec![vec![' '; usize::from(cols)]; usize::from(rows)],
            dirty: vec![true; usize::from(rows)],
            cursor: (0, 0),
            implied_newline: false,
            backlight: true,
        }
    }

    #[must_use]
    pub fn row_text(&self, row: u8) -> String {
        self.cells
            .get(usize::from(row))
            .map(|cells| cells.iter().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn cursor(&self) -> (u8, u8) {
        self.cursor
    }

    #[must_use]
    pub fn backlight(&self) -> bool {
        self.backlight
    }

    /// Rows changed since the last call, in ascending order
    pub fn take_dirty_rows(&mut self) -> Vec<u8> {
        let mut rows = Vec::new();
        for (row, dirty) in (0u8..).zip(self.dirty.iter_mut()) {
            if std::mem::take(dirty) {
                rows.push(row);
            }
        }
        rows
    }

    fn newline(&mut self) {
        self.cursor = (0, (self.cursor.1 + 1) % self.rows);
    }

    fn put_char(&mut self, c: char) {
        let (col, row) = self.cursor;
        self.cells[usize::from(row)][usize::from(col)] = c;
        self.dirty[usize::from(row)] = true;
        if col + 1 >= self.cols {
            self.newline();
            self.implied_newline = true;
        } else {
            self.cursor.0 = col + 1;
            self.implied_newline = false;
        }
    }
}

impl Default for TextGrid {
    fn default() -> Self {
        Self::new(LCD_COLUMNS, LCD_ROWS)
    }
}

impl CharacterDisplay for TextGrid {
    fn clear(&mut self) -> Result<(), DisplayError> {
        for row in &mut self.cells {
            row.fill(' ');
        }
        self.dirty.fill(true);
        self.cursor = (0, 0);
        self.implied_newline = false;
        Ok(())
    }

    fn move_to(&mut self, col: u8, row: u8) -> Result<(), DisplayError> {
        if col >= self.cols || row >= self.rows {
            return Err(DisplayError::OutOfBounds { col, row });
        }
        self.cursor = (col, row);
        self.implied_newline = false;
        Ok(())
    }

    fn putstr(&mut self, text: &str) -> Result<(), DisplayError> {
        for c in text.chars() {
            if c == '\n' {
                if !self.implied_newline {
                    self.newline();
                }
                self.implied_newline = false;
            } else {
                self.put_char(c);
            }
        }
        Ok(())
    }

    fn backlight_on(&mut self) -> Result<(), DisplayError> {
        self.backlight = true;
        Ok(())
    }

    fn backlight_off(&mut self) -> Result<(), DisplayError> {
        self.backlight = false;
        Ok(())
    }
}
