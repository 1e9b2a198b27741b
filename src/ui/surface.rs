//! In-memory surface
//!
//! Keeps projected cells in a plain buffer instead of a real terminal. Used
//! by headless hosts and for inspecting what a draw pass produced.

use std::io;

use super::renderer::Surface;
use crate::core::grid::CellStyle;

pub struct MemorySurface {
    width: u16,
    height: u16,
    cells: Vec<Option<(char, CellStyle)>>,
    cursor: Option<(u16, u16)>,
    cursor_calls: usize,
}

impl MemorySurface {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            cells: vec![None; width as usize * height as usize],
            cursor: None,
            cursor_calls: 0,
        }
    }

    pub fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    fn index(&self, x: u16, y: u16) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y as usize * self.width as usize + x as usize)
    }

    pub fn cell_at(&self, x: u16, y: u16) -> Option<(char, CellStyle)> {
        self.index(x, y).and_then(|i| self.cells[i])
    }

    pub fn char_at(&self, x: u16, y: u16) -> Option<char> {
        self.cell_at(x, y).map(|(ch, _)| ch)
    }

    /// Cursor position, or `None` while hidden
    pub fn cursor(&self) -> Option<(u16, u16)> {
        self.cursor
    }

    /// Number of show/hide instructions received so far
    pub fn cursor_calls(&self) -> usize {
        self.cursor_calls
    }

    /// Render contents as text, one line per row, with `' '` for empty
    /// positions
    pub fn to_text(&self) -> String {
        let mut output = String::with_capacity((self.width as usize + 1) * self.height as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                output.push(self.char_at(x, y).unwrap_or(' '));
            }
            output.push('\n');
        }
        output
    }
}

impl Surface for MemorySurface {
    fn set_content(&mut self, x: u16, y: u16, ch: char, style: CellStyle) -> io::Result<()> {
        // Off-surface writes are clipped
        if let Some(i) = self.index(x, y) {
            self.cells[i] = Some((ch, style));
        }
        Ok(())
    }

    fn show_cursor(&mut self, x: u16, y: u16) -> io::Result<()> {
        self.cursor = Some((x, y));
        self.cursor_calls += 1;
        Ok(())
    }

    fn hide_cursor(&mut self) -> io::Result<()> {
        self.cursor = None;
        self.cursor_calls += 1;
        Ok(())
    }
}
