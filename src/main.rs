//! cellterm - run a program inside a region of the current terminal
//!
//! The child runs on its own pty; its screen is drawn at the configured
//! origin and every key press is forwarded to it. The program exits when
//! the child does.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::Context;
use crossterm::{
    cursor::{MoveTo, Show},
    event::{self, Event},
    execute,
    style::{Attribute, ResetColor, SetAttribute},
    terminal::{
        self, Clear, ClearType, DisableLineWrap, EnableLineWrap, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use portable_pty::CommandBuilder;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use cellterm::config::{self, Command, Config};
use cellterm::ui::CrosstermSurface;
use cellterm::{SessionError, Terminal};

fn print_help() {
    eprintln!("cellterm {}", env!("CARGO_PKG_VERSION"));
    eprintln!("Run a program inside a region of the current terminal");
    eprintln!();
    eprintln!("Usage: cellterm [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -s, --shell <CMD>     Program to run (default: config, then $SHELL)");
    eprintln!("  -x <COL>              Left edge of the view");
    eprintln!("  -y <ROW>              Top edge of the view");
    eprintln!("  --width <COLS>        View width (default: rest of the screen)");
    eprintln!("  --height <ROWS>       View height (default: rest of the screen)");
    eprintln!("  --log-level <FILTER>  Log filter when RUST_LOG is unset");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Configuration: ~/.cellterm/config.toml");
    eprintln!("Log file:      ~/.cellterm/cellterm.log");
}

fn print_version() {
    eprintln!("cellterm {}", env!("CARGO_PKG_VERSION"));
}

fn main() -> anyhow::Result<()> {
    let config = match config::parse_args(Config::load(), std::env::args().skip(1)) {
        Ok(Command::Run(config)) => config,
        Ok(Command::Help) => {
            print_help();
            return Ok(());
        }
        Ok(Command::Version) => {
            print_version();
            return Ok(());
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    init_logging(&config);
    info!("cellterm starting...");

    let result = run(&config);
    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}

/// Log to a file; stdout belongs to the rendered screen
fn init_logging(config: &Config) {
    let log_path = config.log_path();
    if let Some(parent) = log_path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let Ok(file) = OpenOptions::new().create(true).append(true).open(&log_path) else {
        return;
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Raw mode and alternate screen for the lifetime of the guard
struct ScreenGuard;

impl ScreenGuard {
    fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let guard = ScreenGuard;
        execute!(
            io::stdout(),
            EnterAlternateScreen,
            DisableLineWrap,
            Clear(ClearType::All),
            MoveTo(0, 0)
        )?;
        Ok(guard)
    }
}

impl Drop for ScreenGuard {
    fn drop(&mut self) {
        let mut stdout = io::stdout();
        let _ = execute!(
            stdout,
            ResetColor,
            SetAttribute(Attribute::Reset),
            Show,
            EnableLineWrap,
            LeaveAlternateScreen
        );
        let _ = stdout.flush();
        let _ = terminal::disable_raw_mode();
    }
}

fn run(config: &Config) -> anyhow::Result<()> {
    let (host_cols, host_rows) = terminal::size().context("Failed to query terminal size")?;
    let (width, height) = config.view_size(host_cols, host_rows);
    let shell = config.shell_command();

    info!("Shell: {}", shell);
    info!("Host terminal: {}x{}", host_cols, host_rows);
    info!(
        "View: {}x{} at ({}, {})",
        width, height, config.view.x, config.view.y
    );

    let mut cmd = CommandBuilder::new(&shell);
    cmd.env("TERM", &config.term);
    cmd.env("CELLTERM", "1");
    cmd.env("CELLTERM_VERSION", env!("CARGO_PKG_VERSION"));

    let _screen = ScreenGuard::enter()?;

    let term = Arc::new(Terminal::new());
    let (redraw_tx, redraw_rx) = mpsc::channel();
    let (exit_tx, exit_rx) = mpsc::channel();

    let runner = Arc::clone(&term);
    thread::spawn(move || {
        let result = runner.run(cmd, redraw_tx, width, height);
        let _ = exit_tx.send(result);
    });

    run_main_loop(&term, config, &redraw_rx, &exit_rx)
}

fn run_main_loop(
    term: &Terminal,
    config: &Config,
    redraw: &Receiver<()>,
    exit: &Receiver<Result<(), SessionError>>,
) -> anyhow::Result<()> {
    let poll_timeout = Duration::from_millis(10);
    let (x, y) = (config.view.x, config.view.y);
    let mut surface = CrosstermSurface::new(io::stdout());

    loop {
        match exit.try_recv() {
            Ok(result) => {
                info!("Session ended");
                return result.context("Session failed");
            }
            Err(TryRecvError::Disconnected) => {
                info!("Session thread gone");
                return Ok(());
            }
            Err(TryRecvError::Empty) => {}
        }

        // Coalesce pending redraw signals into one draw
        let mut dirty = false;
        while redraw.try_recv().is_ok() {
            dirty = true;
        }

        if event::poll(poll_timeout)? {
            match event::read()? {
                Event::Resize(cols, rows) => {
                    let (width, height) = config.view_size(cols, rows);
                    if let Err(e) = term.resize(width, height) {
                        warn!("Resize failed: {}", e);
                    }
                    execute!(surface.get_mut(), Clear(ClearType::All))?;
                    dirty = true;
                }
                evt => term.handle_event(&evt),
            }
        }

        if dirty {
            term.draw(&mut surface, x, y)?;
            surface.flush()?;
        }
    }
}
