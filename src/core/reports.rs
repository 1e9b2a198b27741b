//! Window operation reports
//!
//! Watches the child's output for xterm window operations (`CSI Ps ; ... t`)
//! and title changes (`OSC 0` / `OSC 2`). Queries are answered from the
//! session's window manipulator; control operations are forwarded to it.

use tracing::trace;
use vte::{Params, Parser, Perform};

use super::window::{WindowManipulator, WindowState};

/// Response that needs to be sent back to the PTY
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// ESC [ 1 t (normal) or ESC [ 2 t (iconified)
    State(WindowState),
    /// ESC [ 3 ; x ; y t
    Position(u16, u16),
    /// ESC [ 4 ; height ; width t
    SizeInPixels(u16, u16),
    /// ESC [ 5 ; height ; width t
    ScreenSizeInPixels(u16, u16),
    /// ESC [ 6 ; height ; width t
    CellSizeInPixels(u16, u16),
    /// ESC [ 8 ; rows ; cols t
    SizeInChars(u16, u16),
    /// ESC [ 9 ; rows ; cols t
    ScreenSizeInChars(u16, u16),
    /// OSC l title ST
    Title(String),
}

impl Response {
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Response::State(WindowState::Minimised) => b"\x1b[2t".to_vec(),
            Response::State(_) => b"\x1b[1t".to_vec(),
            Response::Position(x, y) => format!("\x1b[3;{};{}t", x, y).into_bytes(),
            Response::SizeInPixels(w, h) => format!("\x1b[4;{};{}t", h, w).into_bytes(),
            Response::ScreenSizeInPixels(w, h) => format!("\x1b[5;{};{}t", h, w).into_bytes(),
            Response::CellSizeInPixels(w, h) => format!("\x1b[6;{};{}t", h, w).into_bytes(),
            Response::SizeInChars(cols, rows) => {
                format!("\x1b[8;{};{}t", rows, cols).into_bytes()
            }
            Response::ScreenSizeInChars(cols, rows) => {
                format!("\x1b[9;{};{}t", rows, cols).into_bytes()
            }
            Response::Title(title) => format!("\x1b]l{}\x1b\\", title).into_bytes(),
        }
    }
}

/// Stateful scanner over pty output
///
/// Sequences may be split across reads; parser state carries over between
/// calls to [`WindowReports::advance`].
pub struct WindowReports {
    parser: Parser,
}

impl Default for WindowReports {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowReports {
    pub fn new() -> Self {
        Self {
            parser: Parser::new(),
        }
    }

    /// Scan a chunk of output, returning the bytes to write back to the pty
    pub fn advance(&mut self, bytes: &[u8], window: &mut dyn WindowManipulator) -> Vec<u8> {
        let mut performer = Performer {
            window,
            responses: Vec::new(),
        };
        for &byte in bytes {
            self.parser.advance(&mut performer, byte);
        }
        performer
            .responses
            .iter()
            .flat_map(Response::to_bytes)
            .collect()
    }
}

struct Performer<'a> {
    window: &'a mut dyn WindowManipulator,
    responses: Vec<Response>,
}

impl Performer<'_> {
    fn window_op(&mut self, ps: &[u16]) {
        let arg = |i: usize| ps.get(i).copied().unwrap_or(0);
        let wm = &mut *self.window;

        let response = match arg(0) {
            1 => {
                wm.restore();
                None
            }
            2 => {
                wm.minimise();
                None
            }
            3 => {
                wm.move_to(arg(1), arg(2));
                None
            }
            4 => {
                wm.resize_in_pixels(arg(2), arg(1));
                None
            }
            8 => {
                wm.resize_in_chars(arg(2), arg(1));
                None
            }
            9 => {
                if arg(1) == 0 {
                    wm.restore();
                } else {
                    wm.maximise();
                }
                None
            }
            10 => {
                let enabled = match arg(1) {
                    0 => false,
                    2 => !wm.is_fullscreen(),
                    _ => true,
                };
                wm.set_fullscreen(enabled);
                None
            }
            11 => Some(Response::State(wm.state())),
            13 => {
                let (x, y) = wm.position();
                Some(Response::Position(x, y))
            }
            14 => {
                let (w, h) = wm.size_in_pixels();
                Some(Response::SizeInPixels(w, h))
            }
            15 => {
                let (w, h) = wm.screen_size_in_pixels();
                Some(Response::ScreenSizeInPixels(w, h))
            }
            16 => {
                let (w, h) = wm.cell_size_in_pixels();
                Some(Response::CellSizeInPixels(w, h))
            }
            18 => {
                let (cols, rows) = wm.size_in_chars();
                Some(Response::SizeInChars(cols, rows))
            }
            19 => {
                let (cols, rows) = wm.screen_size_in_chars();
                Some(Response::ScreenSizeInChars(cols, rows))
            }
            21 => Some(Response::Title(wm.title())),
            22 => {
                wm.save_title_to_stack();
                None
            }
            23 => {
                wm.restore_title_from_stack();
                None
            }
            op => {
                trace!("ignoring window op {}", op);
                None
            }
        };

        if let Some(response) = response {
            self.responses.push(response);
        }
    }
}

impl Perform for Performer<'_> {
    fn csi_dispatch(&mut self, params: &Params, intermediates: &[u8], ignore: bool, action: char) {
        if action != 't' || ignore || !intermediates.is_empty() {
            return;
        }
        let ps: Vec<u16> = params
            .iter()
            .map(|p| p.first().copied().unwrap_or(0))
            .collect();
        self.window_op(&ps);
    }

    fn osc_dispatch(&mut self, params: &[&[u8]], _bell_terminated: bool) {
        match params.first().copied() {
            Some(b"0") | Some(b"2") => {
                let title = params[1..]
                    .iter()
                    .map(|p| String::from_utf8_lossy(p))
                    .collect::<Vec<_>>()
                    .join(";");
                self.window.set_title(&title);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::window::StaticWindow;

    #[derive(Default)]
    struct RecordingWindow {
        calls: Vec<String>,
        title: String,
        fullscreen: bool,
    }

    impl WindowManipulator for RecordingWindow {
        fn state(&self) -> WindowState {
            WindowState::Minimised
        }
        fn position(&self) -> (u16, u16) {
            (7, 9)
        }
        fn size_in_pixels(&self) -> (u16, u16) {
            (640, 384)
        }
        fn cell_size_in_pixels(&self) -> (u16, u16) {
            (8, 16)
        }
        fn size_in_chars(&self) -> (u16, u16) {
            (80, 24)
        }
        fn is_fullscreen(&self) -> bool {
            self.fullscreen
        }
        fn title(&self) -> String {
            self.title.clone()
        }
        fn set_title(&mut self, title: &str) {
            self.title = title.to_string();
        }
        fn minimise(&mut self) {
            self.calls.push("minimise".into());
        }
        fn maximise(&mut self) {
            self.calls.push("maximise".into());
        }
        fn restore(&mut self) {
            self.calls.push("restore".into());
        }
        fn move_to(&mut self, x: u16, y: u16) {
            self.calls.push(format!("move {} {}", x, y));
        }
        fn resize_in_chars(&mut self, w: u16, h: u16) {
            self.calls.push(format!("chars {}x{}", w, h));
        }
        fn set_fullscreen(&mut self, enabled: bool) {
            self.fullscreen = enabled;
            self.calls.push(format!("fullscreen {}", enabled));
        }
    }

    #[test]
    fn test_size_queries() {
        let mut reports = WindowReports::new();
        let mut wm = StaticWindow::new((80, 24), (800, 480));

        assert_eq!(reports.advance(b"\x1b[18t", &mut wm), b"\x1b[8;24;80t");
        assert_eq!(reports.advance(b"\x1b[14t", &mut wm), b"\x1b[4;480;800t");
        assert_eq!(reports.advance(b"\x1b[16t", &mut wm), b"\x1b[6;20;10t");
        assert_eq!(reports.advance(b"\x1b[19t", &mut wm), b"\x1b[9;24;80t");
        assert_eq!(reports.advance(b"\x1b[15t", &mut wm), b"\x1b[5;480;800t");
    }

    #[test]
    fn test_query_split_across_reads() {
        let mut reports = WindowReports::new();
        let mut wm = StaticWindow::new((100, 30), (1000, 600));

        assert!(reports.advance(b"hello \x1b[1", &mut wm).is_empty());
        assert_eq!(reports.advance(b"8t world", &mut wm), b"\x1b[8;30;100t");
    }

    #[test]
    fn test_state_position_and_title() {
        let mut reports = WindowReports::new();
        let mut wm = RecordingWindow::default();

        assert_eq!(reports.advance(b"\x1b[11t", &mut wm), b"\x1b[2t");
        assert_eq!(reports.advance(b"\x1b[13t", &mut wm), b"\x1b[3;7;9t");

        assert!(reports.advance(b"\x1b]2;my title\x07", &mut wm).is_empty());
        assert_eq!(reports.advance(b"\x1b[21t", &mut wm), b"\x1b]lmy title\x1b\\");
    }

    #[test]
    fn test_static_window_keeps_title() {
        let mut reports = WindowReports::new();
        let mut wm = StaticWindow::new((80, 24), (0, 0));

        reports.advance(b"\x1b]0;changed\x1b\\", &mut wm);
        assert_eq!(reports.advance(b"\x1b[21t", &mut wm), b"\x1b]lterm\x1b\\");
    }

    #[test]
    fn test_control_ops_forwarded() {
        let mut reports = WindowReports::new();
        let mut wm = RecordingWindow::default();

        let out = reports.advance(
            b"\x1b[2t\x1b[1t\x1b[3;10;20t\x1b[8;24;80t\x1b[9;1t\x1b[10;2t",
            &mut wm,
        );
        assert!(out.is_empty());
        assert_eq!(
            wm.calls,
            vec![
                "minimise",
                "restore",
                "move 10 20",
                "chars 80x24",
                "maximise",
                "fullscreen true",
            ]
        );
    }

    #[test]
    fn test_unrelated_sequences_ignored() {
        let mut reports = WindowReports::new();
        let mut wm = StaticWindow::new((80, 24), (0, 0));

        let out = reports.advance(b"\x1b[2J\x1b[1;1H\x1b[31mtext\x1b[0m\x1b[?25l", &mut wm);
        assert!(out.is_empty());
    }
}
