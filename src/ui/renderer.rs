//! Grid projection onto a display surface
//!
//! Copies a session's grid snapshot onto a [`Surface`] at a given origin,
//! places the cursor, and writes any inline sixel images straight to a raw
//! output stream.

use std::io::{self, Write};

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    queue,
    style::{Attribute, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
};

use crate::core::grid::{AttrFlags, CellStyle, GridSnapshot, ImageRegion};

/// DECSIXEL introducer (`ESC P 0;0;8 q`) followed by DECGRA `"1;1`
const SIXEL_INTRODUCER: &[u8] = b"\x1bP0;0;8q\"1;1";
/// String terminator
const SIXEL_TERMINATOR: &[u8] = b"\x1b\\";

/// Drawing target for projected cells
pub trait Surface {
    /// Draw `ch` with `style` at `(x, y)`
    fn set_content(&mut self, x: u16, y: u16, ch: char, style: CellStyle) -> io::Result<()>;

    fn show_cursor(&mut self, x: u16, y: u16) -> io::Result<()>;

    fn hide_cursor(&mut self) -> io::Result<()>;
}

/// Project `grid` onto `surface` with its top-left corner at `(x, y)`
///
/// Rows are visited bottom to top, columns left to right. Unset cells leave
/// the surface untouched. Image regions go to `raw` after every cell and
/// the cursor have been handled.
pub fn project<S, W>(grid: &GridSnapshot, surface: &mut S, raw: &mut W, x: u16, y: u16) -> io::Result<()>
where
    S: Surface + ?Sized,
    W: Write + ?Sized,
{
    let width = grid.view_width();
    let height = grid.view_height();

    for view_y in (0..height).rev() {
        for view_x in 0..width {
            let Some(cell) = grid.cell(view_x, view_y) else {
                continue;
            };
            surface.set_content(
                x.saturating_add(view_x),
                y.saturating_add(view_y),
                cell.ch,
                cell.style,
            )?;
        }
    }

    let cursor = grid.cursor();
    if cursor.visible {
        surface.show_cursor(x.saturating_add(cursor.col), y.saturating_add(cursor.row))?;
    } else {
        surface.hide_cursor()?;
    }

    for image in grid.images() {
        write_sixel(raw, image, x, y)?;
    }
    Ok(())
}

/// Write one image region to the raw stream as a positioned sixel string
///
/// This bypasses the surface, which has no notion of raster images.
pub fn write_sixel<W: Write + ?Sized>(raw: &mut W, image: &ImageRegion, x: u16, y: u16) -> io::Result<()> {
    let row = u32::from(y) + u32::from(image.row);
    let col = u32::from(x) + u32::from(image.col);
    write!(raw, "\x1b[{};{}H", row, col)?;
    raw.write_all(SIXEL_INTRODUCER)?;
    raw.write_all(&image.data)?;
    raw.write_all(SIXEL_TERMINATOR)?;
    Ok(())
}

/// Surface that queues crossterm commands on a writer
pub struct CrosstermSurface<W: Write> {
    out: W,
    /// Last style sent, to skip redundant SGR output
    current_style: Option<CellStyle>,
}

impl<W: Write> CrosstermSurface<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            current_style: None,
        }
    }

    /// Push queued commands to the writer and reset attributes
    pub fn flush(&mut self) -> io::Result<()> {
        queue!(self.out, ResetColor, SetAttribute(Attribute::Reset))?;
        self.current_style = None;
        self.out.flush()
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Apply cell attributes
    fn apply_style(&mut self, style: CellStyle) -> io::Result<()> {
        if self.current_style == Some(style) {
            return Ok(());
        }

        queue!(self.out, SetAttribute(Attribute::Reset))?;

        const ATTRS: [(AttrFlags, Attribute); 8] = [
            (AttrFlags::BOLD, Attribute::Bold),
            (AttrFlags::DIM, Attribute::Dim),
            (AttrFlags::ITALIC, Attribute::Italic),
            (AttrFlags::UNDERLINE, Attribute::Underlined),
            (AttrFlags::BLINK, Attribute::SlowBlink),
            (AttrFlags::INVERSE, Attribute::Reverse),
            (AttrFlags::HIDDEN, Attribute::Hidden),
            (AttrFlags::STRIKETHROUGH, Attribute::CrossedOut),
        ];
        for (flag, attr) in ATTRS {
            if style.flags.contains(flag) {
                queue!(self.out, SetAttribute(attr))?;
            }
        }

        queue!(
            self.out,
            SetForegroundColor(style.fg.to_crossterm()),
            SetBackgroundColor(style.bg.to_crossterm())
        )?;

        self.current_style = Some(style);
        Ok(())
    }
}

impl<W: Write> Surface for CrosstermSurface<W> {
    fn set_content(&mut self, x: u16, y: u16, ch: char, style: CellStyle) -> io::Result<()> {
        self.apply_style(style)?;
        queue!(self.out, MoveTo(x, y), Print(ch))
    }

    fn show_cursor(&mut self, x: u16, y: u16) -> io::Result<()> {
        queue!(self.out, MoveTo(x, y), Show)
    }

    fn hide_cursor(&mut self) -> io::Result<()> {
        queue!(self.out, Hide)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::grid::{Color, GridCell};
    use crate::ui::surface::MemorySurface;

    fn grid_with_text(width: u16, height: u16, rows: &[&str]) -> GridSnapshot {
        let mut grid = GridSnapshot::new(width, height);
        for (row, text) in rows.iter().enumerate() {
            for (col, ch) in text.chars().enumerate() {
                if ch != '.' {
                    grid.set_cell(col as u16, row as u16, Some(GridCell::new(ch, CellStyle::default())));
                }
            }
        }
        grid
    }

    /// Records every call in order
    #[derive(Default)]
    struct CallLog {
        calls: Vec<String>,
    }

    impl Surface for CallLog {
        fn set_content(&mut self, x: u16, y: u16, ch: char, _style: CellStyle) -> io::Result<()> {
            self.calls.push(format!("set {} {} {}", x, y, ch));
            Ok(())
        }
        fn show_cursor(&mut self, x: u16, y: u16) -> io::Result<()> {
            self.calls.push(format!("show {} {}", x, y));
            Ok(())
        }
        fn hide_cursor(&mut self) -> io::Result<()> {
            self.calls.push("hide".to_string());
            Ok(())
        }
    }

    #[test]
    fn test_cells_drawn_at_origin() {
        let grid = grid_with_text(3, 2, &["abc", "de."]);
        let mut surface = MemorySurface::new(10, 10);
        let mut raw = Vec::new();

        project(&grid, &mut surface, &mut raw, 2, 3).unwrap();

        assert_eq!(surface.char_at(2, 3), Some('a'));
        assert_eq!(surface.char_at(4, 3), Some('c'));
        assert_eq!(surface.char_at(2, 4), Some('d'));
        assert_eq!(surface.char_at(3, 4), Some('e'));
        assert!(raw.is_empty());
    }

    #[test]
    fn test_unset_cells_leave_surface_untouched() {
        let grid = grid_with_text(3, 1, &["a.c"]);
        let mut surface = MemorySurface::new(3, 1);
        let marker = CellStyle::default().fg(Color::Indexed(3));
        surface.set_content(1, 0, '#', marker).unwrap();

        project(&grid, &mut surface, &mut Vec::new(), 0, 0).unwrap();

        assert_eq!(surface.cell_at(1, 0), Some(('#', marker)));
        assert_eq!(surface.char_at(0, 0), Some('a'));
        assert_eq!(surface.char_at(2, 0), Some('c'));
    }

    #[test]
    fn test_draws_stay_within_view() {
        let grid = grid_with_text(4, 3, &["abcd", "efgh", "ijkl"]);
        let mut log = CallLog::default();

        project(&grid, &mut log, &mut Vec::new(), 0, 0).unwrap();

        let sets: Vec<_> = log.calls.iter().filter(|c| c.starts_with("set")).collect();
        assert_eq!(sets.len(), 12);
        for call in sets {
            let parts: Vec<u16> = call
                .split(' ')
                .skip(1)
                .take(2)
                .map(|p| p.parse().unwrap())
                .collect();
            assert!(parts[0] < 4 && parts[1] < 3, "{}", call);
        }
    }

    #[test]
    fn test_rows_visited_bottom_to_top() {
        let grid = grid_with_text(2, 2, &["ab", "cd"]);
        let mut log = CallLog::default();

        project(&grid, &mut log, &mut Vec::new(), 0, 0).unwrap();

        assert_eq!(
            log.calls,
            vec!["set 0 1 c", "set 1 1 d", "set 0 0 a", "set 1 0 b", "show 0 0"]
        );
    }

    #[test]
    fn test_visible_cursor_shown_once() {
        let mut grid = grid_with_text(5, 5, &["hi"]);
        grid.set_cursor(2, 0, true);
        let mut surface = MemorySurface::new(20, 20);

        project(&grid, &mut surface, &mut Vec::new(), 4, 6).unwrap();

        assert_eq!(surface.cursor(), Some((6, 6)));
        assert_eq!(surface.cursor_calls(), 1);
    }

    #[test]
    fn test_hidden_cursor_hidden_once() {
        let mut grid = grid_with_text(5, 5, &["hi"]);
        grid.set_cursor(2, 0, false);
        let mut surface = MemorySurface::new(20, 20);
        surface.show_cursor(1, 1).unwrap();

        project(&grid, &mut surface, &mut Vec::new(), 0, 0).unwrap();

        assert_eq!(surface.cursor(), None);
        assert_eq!(surface.cursor_calls(), 2);
    }

    #[test]
    fn test_image_emitted_after_cells() {
        let mut grid = grid_with_text(20, 10, &["x"]);
        grid.push_image(ImageRegion {
            col: 3,
            row: 2,
            pixel_width: 10,
            data: b"#0;2;0;0;0~~".to_vec(),
        });
        let mut surface = MemorySurface::new(40, 20);
        let mut raw = Vec::new();

        project(&grid, &mut surface, &mut raw, 5, 1).unwrap();

        assert_eq!(raw, b"\x1b[3;8H\x1bP0;0;8q\"1;1#0;2;0;0;0~~\x1b\\");
        assert_eq!(surface.char_at(5, 1), Some('x'));
    }

    #[test]
    fn test_multiple_images_in_order() {
        let mut grid = GridSnapshot::new(10, 10);
        for (i, payload) in [b"AA".to_vec(), b"BB".to_vec()].into_iter().enumerate() {
            grid.push_image(ImageRegion {
                col: i as u16,
                row: 0,
                pixel_width: 4,
                data: payload,
            });
        }
        let mut raw = Vec::new();

        project(&grid, &mut MemorySurface::new(10, 10), &mut raw, 0, 0).unwrap();

        let expected = [
            b"\x1b[0;0H\x1bP0;0;8q\"1;1AA\x1b\\".as_slice(),
            b"\x1b[0;1H\x1bP0;0;8q\"1;1BB\x1b\\".as_slice(),
        ]
        .concat();
        assert_eq!(raw, expected);
    }

    #[test]
    fn test_empty_grid() {
        let grid = GridSnapshot::new(0, 0);
        let mut log = CallLog::default();
        project(&grid, &mut log, &mut Vec::new(), 3, 3).unwrap();
        assert_eq!(log.calls, vec!["hide"]);
    }

    #[test]
    fn test_crossterm_surface_output() {
        let mut surface = CrosstermSurface::new(Vec::new());
        let bold = CellStyle::default().flags(AttrFlags::BOLD);

        surface.set_content(1, 2, 'a', bold).unwrap();
        surface.set_content(2, 2, 'b', bold).unwrap();
        surface.hide_cursor().unwrap();
        surface.flush().unwrap();

        let out = String::from_utf8(surface.into_inner()).unwrap();
        // MoveTo is zero-based in crossterm and one-based on the wire
        assert!(out.contains("\x1b[3;2Ha"));
        assert!(out.contains("\x1b[3;3Hb"));
        assert_eq!(out.matches("\x1b[1m").count(), 1);
        assert!(out.contains("\x1b[?25l"));
    }
}
