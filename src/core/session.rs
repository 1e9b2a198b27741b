//! Session contract
//!
//! The terminal session owns the pty, the escape-sequence parser and the
//! character grid. The adapter only talks to it through [`TerminalSession`].

use std::io;
use std::sync::mpsc::Sender;

use portable_pty::CommandBuilder;
use thiserror::Error;

use super::grid::GridSnapshot;
use super::window::WindowManipulator;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Failed to open pty: {0}")]
    Open(anyhow::Error),

    #[error("Failed to spawn process: {0}")]
    Spawn(anyhow::Error),

    #[error("Failed to resize pty: {0}")]
    Resize(anyhow::Error),

    #[error("PTY I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Session is not running")]
    NotRunning,
}

pub type Result<T> = std::result::Result<T, SessionError>;

/// Terminal emulation engine driven by a child process
///
/// Implementations synchronise grid reads against their own output
/// processing, so every method takes `&self` and may be called from any
/// thread.
pub trait TerminalSession: Send + Sync {
    /// Forward encoded input to the child
    fn write_input(&self, bytes: &[u8]) -> Result<()>;

    /// Snapshot of the active buffer at its current dimensions
    fn active_grid(&self) -> GridSnapshot;

    /// Change the view dimensions
    fn set_size(&self, rows: u16, cols: u16) -> Result<()>;

    /// Replace the window used to answer metric queries
    fn set_window_manipulator(&self, window: Box<dyn WindowManipulator>);

    /// Run `cmd` until its output closes, signalling `redraw` whenever the
    /// grid may have changed
    fn run(&self, cmd: CommandBuilder, redraw: Sender<()>, rows: u16, cols: u16) -> Result<()>;
}
