//! Host-facing input and rendering.
//!
//! - **keymapper**: key events to pty byte sequences
//! - **renderer**: grid projection onto a surface, crossterm surface
//! - **surface**: in-memory surface

pub mod keymapper;
pub mod renderer;
pub mod surface;

pub use keymapper::*;
pub use renderer::*;
pub use surface::MemorySurface;
