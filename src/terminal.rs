//! Terminal adapter
//!
//! Wires a [`TerminalSession`] to the host: key events are encoded and sent
//! to the session, and each draw projects the session's grid onto a surface.
//!
//! ```text
//! crossterm Event ──> KeyMapper ──> session.write_input
//! session.active_grid ──> project ──> Surface (+ raw sixel bytes)
//! ```

use std::io::{self, Write};
use std::sync::mpsc::Sender;

use crossterm::event::{Event, KeyEventKind};
use portable_pty::CommandBuilder;
use tracing::{trace, warn};

use crate::core::pty::PtySession;
use crate::core::session::{Result, TerminalSession};
use crate::core::window::WindowManipulator;
use crate::ui::keymapper::{KeyEvent, KeyMapper};
use crate::ui::renderer::{project, Surface};

/// A terminal embedded in a host UI
pub struct Terminal<S: TerminalSession = PtySession> {
    session: S,
}

impl Default for Terminal<PtySession> {
    fn default() -> Self {
        Self::new()
    }
}

impl Terminal<PtySession> {
    /// Create a terminal over a fresh pty session that reports the host
    /// terminal's metrics
    pub fn new() -> Self {
        Self::with_session(PtySession::default())
    }
}

impl<S: TerminalSession> Terminal<S> {
    pub fn with_session(session: S) -> Self {
        Self { session }
    }

    /// Replace the window used to answer the child's size queries
    pub fn with_window_manipulator(self, window: impl WindowManipulator + 'static) -> Self {
        self.session.set_window_manipulator(Box::new(window));
        self
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    /// Run `cmd` in the session at `width` x `height` cells
    ///
    /// Blocks until the child's output closes. Spawn and pty errors are
    /// returned as-is.
    pub fn run(&self, cmd: CommandBuilder, redraw: Sender<()>, width: u16, height: u16) -> Result<()> {
        self.session.run(cmd, redraw, height, width)
    }

    /// Forward a host event. Only key presses are used.
    pub fn handle_event(&self, event: &Event) {
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => {
                self.handle_key(&KeyEvent::from(*key));
            }
            _ => {}
        }
    }

    /// Encode a key and write it to the session
    pub fn handle_key(&self, event: &KeyEvent) {
        let bytes = KeyMapper::encode(event);
        if bytes.is_empty() {
            trace!("no encoding for {:?}", event);
            return;
        }
        if let Err(e) = self.session.write_input(&bytes) {
            warn!("dropping key input: {}", e);
        }
    }

    /// Draw the session onto `surface` at `(x, y)`; images go to stdout
    pub fn draw<Sf: Surface + ?Sized>(&self, surface: &mut Sf, x: u16, y: u16) -> io::Result<()> {
        let stdout = io::stdout();
        let mut raw = stdout.lock();
        self.draw_to(surface, &mut raw, x, y)?;
        raw.flush()
    }

    /// Draw the session onto `surface`, writing images to `raw`
    pub fn draw_to<Sf, W>(&self, surface: &mut Sf, raw: &mut W, x: u16, y: u16) -> io::Result<()>
    where
        Sf: Surface + ?Sized,
        W: Write + ?Sized,
    {
        let grid = self.session.active_grid();
        project(&grid, surface, raw, x, y)
    }

    /// Resize the session view
    pub fn resize(&self, width: u16, height: u16) -> Result<()> {
        self.session.set_size(height, width)
    }
}
