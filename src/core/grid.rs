//! Grid snapshot
//!
//! A read-only copy of the session's visible buffer: cells, cursor and any
//! inline image placements. Produced fresh for every draw.

use bitflags::bitflags;

/// Snapshot of the active screen buffer
#[derive(Clone, Debug, Default)]
pub struct GridSnapshot {
    width: u16,
    height: u16,
    /// Row-major; `None` marks an unset cell
    cells: Vec<Option<GridCell>>,
    cursor: CursorState,
    images: Vec<ImageRegion>,
}

impl GridSnapshot {
    /// Create an empty snapshot where every cell is unset
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            cells: vec![None; width as usize * height as usize],
            cursor: CursorState {
                visible: width > 0 && height > 0,
                ..CursorState::default()
            },
            images: Vec::new(),
        }
    }

    pub fn view_width(&self) -> u16 {
        self.width
    }

    pub fn view_height(&self) -> u16 {
        self.height
    }

    fn index(&self, col: u16, row: u16) -> Option<usize> {
        if col < self.width && row < self.height {
            Some(row as usize * self.width as usize + col as usize)
        } else {
            None
        }
    }

    /// Cell at `(col, row)`, or `None` when unset or out of range
    pub fn cell(&self, col: u16, row: u16) -> Option<&GridCell> {
        self.index(col, row).and_then(|i| self.cells[i].as_ref())
    }

    /// Store a cell. Writes outside the view are dropped.
    pub fn set_cell(&mut self, col: u16, row: u16, cell: Option<GridCell>) {
        if let Some(i) = self.index(col, row) {
            self.cells[i] = cell;
        }
    }

    pub fn cursor(&self) -> &CursorState {
        &self.cursor
    }

    /// Set the cursor, clamped into the view
    ///
    /// An empty view has no cell to put the cursor on, so it stays hidden.
    pub fn set_cursor(&mut self, col: u16, row: u16, visible: bool) {
        self.cursor = CursorState {
            col: col.min(self.width.saturating_sub(1)),
            row: row.min(self.height.saturating_sub(1)),
            visible: visible && self.width > 0 && self.height > 0,
        };
    }

    pub fn images(&self) -> &[ImageRegion] {
        &self.images
    }

    /// Add an image placement. Images anchored outside the view are dropped.
    pub fn push_image(&mut self, image: ImageRegion) {
        if image.col < self.width && image.row < self.height {
            self.images.push(image);
        }
    }
}

/// A single drawable cell
#[derive(Clone, Debug, PartialEq)]
pub struct GridCell {
    pub ch: char,
    pub style: CellStyle,
}

impl GridCell {
    pub fn new(ch: char, style: CellStyle) -> Self {
        Self { ch, style }
    }
}

/// Cell style
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CellStyle {
    pub fg: Color,
    pub bg: Color,
    pub flags: AttrFlags,
}

impl CellStyle {
    pub fn fg(mut self, color: Color) -> Self {
        self.fg = color;
        self
    }

    pub fn bg(mut self, color: Color) -> Self {
        self.bg = color;
        self
    }

    pub fn flags(mut self, flags: AttrFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// Color definition
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Color {
    #[default]
    Default,
    Indexed(u8),
    Rgb(u8, u8, u8),
}

impl Color {
    /// Convert to crossterm color
    pub fn to_crossterm(self) -> crossterm::style::Color {
        match self {
            Color::Default => crossterm::style::Color::Reset,
            Color::Indexed(n) => crossterm::style::Color::AnsiValue(n),
            Color::Rgb(r, g, b) => crossterm::style::Color::Rgb { r, g, b },
        }
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct AttrFlags: u16 {
        const BOLD          = 0b0000_0000_0001;
        const DIM           = 0b0000_0000_0010;
        const ITALIC        = 0b0000_0000_0100;
        const UNDERLINE     = 0b0000_0000_1000;
        const BLINK         = 0b0000_0001_0000;
        const INVERSE       = 0b0000_0010_0000;
        const HIDDEN        = 0b0000_0100_0000;
        const STRIKETHROUGH = 0b0000_1000_0000;
    }
}

/// Cursor state within the visible view
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CursorState {
    pub col: u16,
    pub row: u16,
    pub visible: bool,
}

impl Default for CursorState {
    fn default() -> Self {
        Self {
            col: 0,
            row: 0,
            visible: true,
        }
    }
}

/// Inline raster image placed on the grid
///
/// `data` is the sixel body following the raster attributes, passed through
/// untouched when the image is drawn. `pixel_width` is what the producer
/// reported; drawing does not scale by it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageRegion {
    pub col: u16,
    pub row: u16,
    pub pixel_width: u32,
    pub data: Vec<u8>,
}
