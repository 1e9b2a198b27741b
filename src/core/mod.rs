//! Terminal session components.
//!
//! - **grid**: snapshot of the session's visible buffer
//! - **session**: contract between the adapter and a terminal engine
//! - **pty**: session running a child on a pseudo terminal
//! - **window**: window metrics reported to the child
//! - **reports**: answers the child's window queries
//! - **sixel**: captures inline sixel images from child output
//!
//! # Architecture
//!
//! ```text
//! PtySession
//! ├── portable-pty (child process I/O)
//! ├── vt100::Parser (cell grid + cursor)
//! └── WindowReports ──> WindowManipulator
//! ```

pub mod grid;
pub mod pty;
pub mod reports;
pub mod session;
pub mod sixel;
pub mod window;
