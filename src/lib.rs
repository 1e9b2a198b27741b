//! Embed a pty-backed terminal inside a cell-based terminal UI.
//!
//! [`Terminal`] owns a session, encodes host key events into the byte
//! sequences a terminal program expects, and draws the session's grid onto
//! any [`Surface`](ui::Surface).

pub mod config;
pub mod core;
pub mod terminal;
pub mod ui;

pub use crate::core::grid::{AttrFlags, CellStyle, Color, CursorState, GridCell, GridSnapshot, ImageRegion};
pub use crate::core::pty::PtySession;
pub use crate::core::session::{SessionError, TerminalSession};
pub use crate::core::window::{HostWindow, StaticWindow, WindowManipulator, WindowState};
pub use crate::terminal::Terminal;
