//! Debug flags and the debug text buffer
//!
//! Text is kept as a grid of character cells sized from the backbuffer.
//! Drawing the grid on screen is left to the backend.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct DebugFlags: u32 {
        const WIREFRAME = 0x1;
        const IFH = 0x2;
        const STATS = 0x4;
        const TEXT = 0x8;
    }
}

pub const CELL_WIDTH: u32 = 8;
pub const CELL_HEIGHT: u32 = 16;
pub const CELL_HEIGHT_SMALL: u32 = 8;

/// Attribute byte: low nibble foreground color, high nibble background.
pub const fn text_attr(fg: u8, bg: u8) -> u8 {
    (fg & 0x0f) | ((bg & 0x0f) << 4)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextCell {
    pub ch: u8,
    pub attr: u8,
}

impl Default for TextCell {
    fn default() -> Self {
        Self { ch: b' ', attr: 0 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TextBuffer {
    columns: u16,
    rows: u16,
    small: bool,
    cells: Vec<TextCell>,
    backbuffer: (u32, u32),
}

impl TextBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        let mut buffer = Self::default();
        buffer.resize(width, height);
        buffer
    }

    /// Rebuild the grid for a new backbuffer size. Content is cleared.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.backbuffer = (width, height);
        self.layout(0);
    }

    fn layout(&mut self, attr: u8) {
        let (width, height) = self.backbuffer;
        let cell_height = if self.small { CELL_HEIGHT_SMALL } else { CELL_HEIGHT };
        self.columns = (width / CELL_WIDTH).min(u16::MAX as u32) as u16;
        self.rows = (height / cell_height).min(u16::MAX as u32) as u16;
        self.cells.clear();
        self.cells.resize(
            self.columns as usize * self.rows as usize,
            TextCell { ch: b' ', attr },
        );
    }

    pub fn columns(&self) -> u16 {
        self.columns
    }

    pub fn rows(&self) -> u16 {
        self.rows
    }

    pub fn is_small(&self) -> bool {
        self.small
    }

    /// Blank every cell with `attr`; `small` switches to 8x8 cells.
    pub fn clear(&mut self, attr: u8, small: bool) {
        self.small = small;
        self.layout(attr);
    }

    /// Write `text` starting at cell (x, y). Characters past the end of the
    /// row are dropped; rows outside the grid are ignored. Non-ASCII
    /// characters print as `?`.
    pub fn print(&mut self, x: u16, y: u16, attr: u8, text: &str) {
        if y >= self.rows || x >= self.columns {
            return;
        }
        let row = y as usize * self.columns as usize;
        let room = (self.columns - x) as usize;
        for (i, ch) in text.chars().take(room).enumerate() {
            let byte = if ch.is_ascii() { ch as u8 } else { b'?' };
            self.cells[row + x as usize + i] = TextCell { ch: byte, attr };
        }
    }

    pub fn cell(&self, x: u16, y: u16) -> Option<TextCell> {
        if x >= self.columns || y >= self.rows {
            return None;
        }
        self.cells
            .get(y as usize * self.columns as usize + x as usize)
            .copied()
    }

    /// Row content with trailing blanks trimmed.
    pub fn row_text(&self, y: u16) -> String {
        if y >= self.rows {
            return String::new();
        }
        let start = y as usize * self.columns as usize;
        let row = &self.cells[start..start + self.columns as usize];
        let text: String = row.iter().map(|c| c.ch as char).collect();
        text.trim_end().to_string()
    }

    pub fn cells(&self) -> &[TextCell] {
        &self.cells
    }
}

/// Print formatted debug text through a [`crate::Renderer`].
///
/// ```ignore
/// dbg_text!(renderer, 0, 3, 0x0f, "Frame: {:7.3}[ms]", dt * 1000.0);
/// ```
#[macro_export]
macro_rules! dbg_text {
    ($renderer:expr, $x:expr, $y:expr, $attr:expr, $($arg:tt)*) => {
        $renderer.dbg_text_print($x, $y, $attr, format_args!($($arg)*))
    };
}
