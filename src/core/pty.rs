//! PTY-backed terminal session
//!
//! Spawns the child on a pseudo terminal via `portable-pty`, feeds its output
//! to a `vt100` parser and answers window queries through the session's
//! [`WindowManipulator`]. Sixel images are captured alongside and anchored
//! at the cursor where they started.

use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Mutex, MutexGuard, PoisonError};

use portable_pty::{native_pty_system, Child, ChildKiller, CommandBuilder, MasterPty, PtySize};
use tracing::{debug, info, warn};

use super::grid::{AttrFlags, CellStyle, Color, GridCell, GridSnapshot, ImageRegion};
use super::reports::WindowReports;
use super::sixel::{SixelEvent, SixelScanner};
use super::session::{Result, SessionError, TerminalSession};
use super::window::{HostWindow, WindowManipulator};

const SCROLLBACK_LEN: usize = 1000;

/// Oldest images are dropped past this count
const MAX_IMAGES: usize = 64;

/// Live pty handles, present only while `run` is active
struct PtyIo {
    master: Box<dyn MasterPty + Send>,
    writer: Box<dyn Write + Send>,
}

/// Terminal session over a real pseudo terminal
pub struct PtySession {
    parser: Mutex<vt100::Parser>,
    images: Mutex<Vec<ImageRegion>>,
    pty: Mutex<Option<PtyIo>>,
    window: Mutex<Box<dyn WindowManipulator>>,
    running: AtomicBool,
}

/// Scanner state that lives for one `run`
#[derive(Default)]
struct OutputScan {
    reports: WindowReports,
    sixels: SixelScanner,
    /// Cursor `(col, row)` where the open sixel string started
    anchor: Option<(u16, u16)>,
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn pty_size(rows: u16, cols: u16) -> PtySize {
    PtySize {
        rows,
        cols,
        pixel_width: 0,
        pixel_height: 0,
    }
}

impl Default for PtySession {
    fn default() -> Self {
        Self::new(24, 80)
    }
}

impl PtySession {
    pub fn new(rows: u16, cols: u16) -> Self {
        Self {
            parser: Mutex::new(vt100::Parser::new(rows, cols, SCROLLBACK_LEN)),
            images: Mutex::new(Vec::new()),
            pty: Mutex::new(None),
            window: Mutex::new(Box::new(HostWindow::new())),
            running: AtomicBool::new(false),
        }
    }

    /// Check if a child is attached
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Feed one chunk of child output
    fn process_output(&self, data: &[u8], scan: &mut OutputScan) {
        let events = scan.sixels.advance(data);
        {
            let mut parser = lock(&self.parser);
            let mut images = lock(&self.images);
            let mut fed = 0;

            for event in events {
                match event {
                    SixelEvent::Start { offset } => {
                        parser.process(&data[fed..offset]);
                        fed = offset;
                        let (row, col) = parser.screen().cursor_position();
                        scan.anchor = Some((col, row));
                    }
                    SixelEvent::Finished {
                        pixel_width,
                        data: payload,
                        ..
                    } => {
                        let Some((col, row)) = scan.anchor.take() else {
                            continue;
                        };
                        if payload.is_empty() {
                            continue;
                        }
                        if images.len() >= MAX_IMAGES {
                            images.remove(0);
                        }
                        images.push(ImageRegion {
                            col,
                            row,
                            pixel_width,
                            data: payload,
                        });
                    }
                    SixelEvent::Cleared { offset } => {
                        parser.process(&data[fed..offset]);
                        fed = offset;
                        images.clear();
                    }
                }
            }
            parser.process(&data[fed..]);
        }

        let reply = {
            let mut window = lock(&self.window);
            scan.reports.advance(data, &mut **window)
        };
        if !reply.is_empty() {
            if let Err(e) = self.write_input(&reply) {
                lock(&self.window).report_error(&e);
            }
        }
    }
}

impl TerminalSession for PtySession {
    fn write_input(&self, bytes: &[u8]) -> Result<()> {
        let mut pty = lock(&self.pty);
        let io = pty.as_mut().ok_or(SessionError::NotRunning)?;
        io.writer.write_all(bytes)?;
        io.writer.flush()?;
        Ok(())
    }

    fn active_grid(&self) -> GridSnapshot {
        let mut grid = snapshot(lock(&self.parser).screen());
        for image in lock(&self.images).iter() {
            grid.push_image(image.clone());
        }
        grid
    }

    fn set_size(&self, rows: u16, cols: u16) -> Result<()> {
        lock(&self.parser).set_size(rows, cols);
        // Anchors no longer line up with the reflowed screen
        lock(&self.images).clear();

        if let Some(io) = lock(&self.pty).as_ref() {
            io.master
                .resize(pty_size(rows, cols))
                .map_err(SessionError::Resize)?;
        }
        debug!("session resized to {}x{}", cols, rows);
        Ok(())
    }

    fn set_window_manipulator(&self, window: Box<dyn WindowManipulator>) {
        *lock(&self.window) = window;
    }

    fn run(&self, cmd: CommandBuilder, redraw: Sender<()>, rows: u16, cols: u16) -> Result<()> {
        let pair = native_pty_system()
            .openpty(pty_size(rows, cols))
            .map_err(SessionError::Open)?;
        let mut child = pair.slave.spawn_command(cmd).map_err(SessionError::Spawn)?;
        // Only the child may hold the slave side, or EOF never arrives
        drop(pair.slave);

        let handles = pair
            .master
            .try_clone_reader()
            .and_then(|reader| Ok((reader, pair.master.take_writer()?)));
        let (mut reader, writer) = match handles {
            Ok(handles) => handles,
            Err(e) => {
                reap(child.as_mut());
                return Err(SessionError::Open(e));
            }
        };

        lock(&self.parser).set_size(rows, cols);
        *lock(&self.pty) = Some(PtyIo {
            master: pair.master,
            writer,
        });
        self.running.store(true, Ordering::SeqCst);
        info!("session started ({}x{})", cols, rows);

        let mut scan = OutputScan::default();
        let mut buffer = vec![0u8; 4096];
        loop {
            match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => {
                    self.process_output(&buffer[..n], &mut scan);
                    // Receiver gone just means nobody is drawing any more
                    let _ = redraw.send(());
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    // Linux reports EIO once the child side has closed
                    debug!("pty read ended: {}", e);
                    break;
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        *lock(&self.pty) = None;

        let status = child.wait()?;
        info!("session ended: {:?}", status);
        let _ = redraw.send(());
        Ok(())
    }
}

/// Stop a child that will never be read from
fn reap(child: &mut (dyn Child + Send + Sync)) {
    if let Err(e) = child.kill() {
        debug!("kill failed: {}", e);
    }
    if let Err(e) = child.wait() {
        warn!("wait failed: {}", e);
    }
}

fn convert_color(color: vt100::Color) -> Color {
    match color {
        vt100::Color::Default => Color::Default,
        vt100::Color::Idx(n) => Color::Indexed(n),
        vt100::Color::Rgb(r, g, b) => Color::Rgb(r, g, b),
    }
}

fn cell_style(cell: &vt100::Cell) -> CellStyle {
    let mut flags = AttrFlags::empty();
    flags.set(AttrFlags::BOLD, cell.bold());
    flags.set(AttrFlags::ITALIC, cell.italic());
    flags.set(AttrFlags::UNDERLINE, cell.underline());
    flags.set(AttrFlags::INVERSE, cell.inverse());

    CellStyle {
        fg: convert_color(cell.fgcolor()),
        bg: convert_color(cell.bgcolor()),
        flags,
    }
}

/// Copy the visible screen into a grid snapshot
///
/// The right half of a wide character is reported as unset so the wide
/// glyph drawn in the left half is not overwritten.
fn snapshot(screen: &vt100::Screen) -> GridSnapshot {
    let (rows, cols) = screen.size();
    let mut grid = GridSnapshot::new(cols, rows);

    for row in 0..rows {
        for col in 0..cols {
            let Some(cell) = screen.cell(row, col) else {
                continue;
            };
            if cell.is_wide_continuation() {
                continue;
            }
            let ch = cell.contents().chars().next().unwrap_or(' ');
            grid.set_cell(col, row, Some(GridCell::new(ch, cell_style(cell))));
        }
    }

    let (cursor_row, cursor_col) = screen.cursor_position();
    grid.set_cursor(cursor_col, cursor_row, !screen.hide_cursor());
    grid
}
