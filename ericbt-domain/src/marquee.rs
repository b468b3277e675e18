/// Rotating window over a banner, advanced one character per tick.
#[derive(Clone, Debug)]
pub struct Marquee {
    chars: Vec<char>,
    offset: usize,
    width: usize,
}

impl Marquee {
    #[must_use]
    pub fn new(text: &str, width: usize) -> Self {
        Self {
            chars: text.chars().collect(),
            offset: 0,
            width,
        }
    }

    /// Rotate left by one and return the visible window
    pub fn advance(&mut self) -> String {
        if !self.chars.is_empty() {
            self.offset = (self.offset + 1) % self.chars.len();
        }
        self.window()
    }

    /// At most `width` characters starting at the current offset, wrapping around
    #[must_use]
    pub fn window(&self) -> String {
        let visible = self.width.min(self.chars.len());
        self.chars
            .iter()
            .cycle()
            .skip(self.offset)
            .take(visible)
            .collect()
    }
}
