//! Window capability shim
//!
//! The session asks its window for metrics when answering size queries from
//! the child program. This crate renders into a grid owned by the host, so
//! there is no real window to control: every control operation is accepted
//! and ignored, and the queries report whatever the host terminal says.

use std::error::Error;

use crossterm::terminal;
use tracing::debug;

/// Window state as reported by XTWINOPS 11
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WindowState {
    #[default]
    Normal,
    Minimised,
    Maximised,
}

/// Window metrics and controls available to a terminal session
///
/// Sizes are `(width, height)` pairs.
pub trait WindowManipulator: Send {
    fn state(&self) -> WindowState;
    fn position(&self) -> (u16, u16);
    fn size_in_pixels(&self) -> (u16, u16);
    fn cell_size_in_pixels(&self) -> (u16, u16);
    fn size_in_chars(&self) -> (u16, u16);
    fn is_fullscreen(&self) -> bool;
    fn title(&self) -> String;

    fn screen_size_in_pixels(&self) -> (u16, u16) {
        self.size_in_pixels()
    }

    fn screen_size_in_chars(&self) -> (u16, u16) {
        self.size_in_chars()
    }

    fn minimise(&mut self) {}
    fn maximise(&mut self) {}
    fn restore(&mut self) {}
    fn set_title(&mut self, _title: &str) {}
    fn resize_in_pixels(&mut self, _width: u16, _height: u16) {}
    fn resize_in_chars(&mut self, _width: u16, _height: u16) {}
    fn move_to(&mut self, _x: u16, _y: u16) {}
    fn set_fullscreen(&mut self, _enabled: bool) {}
    fn save_title_to_stack(&mut self) {}
    fn restore_title_from_stack(&mut self) {}

    /// Sink for non-fatal session errors
    fn report_error(&mut self, _err: &dyn Error) {}
}

/// Host terminal size as reported by the OS
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct HostSize {
    cols: u16,
    rows: u16,
    width: u16,
    height: u16,
}

fn cell_size(size: HostSize) -> (u16, u16) {
    let w = if size.cols == 0 { 0 } else { size.width / size.cols };
    let h = if size.rows == 0 { 0 } else { size.height / size.rows };
    (w, h)
}

/// Window backed by the controlling terminal
///
/// Every query re-reads the terminal size; failures yield zeros.
#[derive(Clone, Copy, Debug, Default)]
pub struct HostWindow;

impl HostWindow {
    pub fn new() -> Self {
        Self
    }

    fn host_size(&self) -> HostSize {
        match terminal::window_size() {
            Ok(ws) => HostSize {
                cols: ws.columns,
                rows: ws.rows,
                width: ws.width,
                height: ws.height,
            },
            Err(e) => {
                debug!("window size query failed: {}", e);
                HostSize::default()
            }
        }
    }
}

impl WindowManipulator for HostWindow {
    fn state(&self) -> WindowState {
        WindowState::Normal
    }

    fn position(&self) -> (u16, u16) {
        (0, 0)
    }

    fn size_in_pixels(&self) -> (u16, u16) {
        let size = self.host_size();
        (size.width, size.height)
    }

    fn cell_size_in_pixels(&self) -> (u16, u16) {
        cell_size(self.host_size())
    }

    fn size_in_chars(&self) -> (u16, u16) {
        let size = self.host_size();
        (size.cols, size.rows)
    }

    fn is_fullscreen(&self) -> bool {
        false
    }

    fn title(&self) -> String {
        "term".to_string()
    }
}

/// Window with fixed metrics, for embedding where the host already knows
/// the geometry
#[derive(Clone, Debug)]
pub struct StaticWindow {
    chars: (u16, u16),
    pixels: (u16, u16),
    title: String,
}

impl StaticWindow {
    pub fn new(chars: (u16, u16), pixels: (u16, u16)) -> Self {
        Self {
            chars,
            pixels,
            title: "term".to_string(),
        }
    }
}

impl WindowManipulator for StaticWindow {
    fn state(&self) -> WindowState {
        WindowState::Normal
    }

    fn position(&self) -> (u16, u16) {
        (0, 0)
    }

    fn size_in_pixels(&self) -> (u16, u16) {
        self.pixels
    }

    fn cell_size_in_pixels(&self) -> (u16, u16) {
        cell_size(HostSize {
            cols: self.chars.0,
            rows: self.chars.1,
            width: self.pixels.0,
            height: self.pixels.1,
        })
    }

    fn size_in_chars(&self) -> (u16, u16) {
        self.chars
    }

    fn is_fullscreen(&self) -> bool {
        false
    }

    fn title(&self) -> String {
        self.title.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_window_metrics() {
        let wm = StaticWindow::new((80, 24), (800, 480));
        assert_eq!(wm.size_in_chars(), (80, 24));
        assert_eq!(wm.size_in_pixels(), (800, 480));
        assert_eq!(wm.cell_size_in_pixels(), (10, 20));
        assert_eq!(wm.screen_size_in_chars(), (80, 24));
        assert_eq!(wm.screen_size_in_pixels(), (800, 480));
    }

    #[test]
    fn test_cell_size_with_unknown_pixels() {
        let wm = StaticWindow::new((80, 24), (0, 0));
        assert_eq!(wm.cell_size_in_pixels(), (0, 0));

        let wm = StaticWindow::new((0, 0), (640, 480));
        assert_eq!(wm.cell_size_in_pixels(), (0, 0));
    }

    #[test]
    fn test_controls_are_noops() {
        let mut wm = StaticWindow::new((80, 24), (800, 480));
        wm.minimise();
        wm.maximise();
        wm.set_fullscreen(true);
        wm.set_title("vim");
        wm.move_to(10, 10);
        wm.resize_in_chars(10, 10);
        wm.report_error(&std::io::Error::new(std::io::ErrorKind::Other, "boom"));

        assert_eq!(wm.state(), WindowState::Normal);
        assert!(!wm.is_fullscreen());
        assert_eq!(wm.title(), "term");
        assert_eq!(wm.position(), (0, 0));
        assert_eq!(wm.size_in_chars(), (80, 24));
    }

    #[test]
    fn test_host_window_never_fails() {
        // Without a controlling terminal the query fails; zeros come back
        let wm = HostWindow::new();
        let (w, h) = wm.cell_size_in_pixels();
        let (pw, ph) = wm.size_in_pixels();
        assert!(w <= pw && h <= ph);
        assert_eq!(wm.title(), "term");
    }
}
