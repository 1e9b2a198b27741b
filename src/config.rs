//! Configuration for the cellterm host binary.
//!
//! Settings come from `~/.cellterm/config.toml`, then command-line flags
//! override individual values.
//!
//! # Configuration File
//!
//! ```toml
//! # Program to run (defaults to $SHELL)
//! shell = "/bin/bash"
//!
//! # TERM value exported to the child
//! term = "xterm-256color"
//!
//! [view]
//! x = 2
//! y = 1
//! # Fixed size; omitted values fill the rest of the host terminal
//! width = 80
//! height = 24
//!
//! [log]
//! level = "debug"
//! file = "/tmp/cellterm.log"
//! ```

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Program to run in the terminal
    pub shell: Option<String>,
    /// TERM exported to the child
    pub term: String,
    /// Placement inside the host terminal
    pub view: ViewConfig,
    /// Logging settings
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shell: None,
            term: "xterm-256color".to_string(),
            view: ViewConfig::default(),
            log: LogConfig::default(),
        }
    }
}

/// View placement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub x: u16,
    pub y: u16,
    pub width: Option<u16>,
    pub height: Option<u16>,
}

/// Log configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter used when RUST_LOG is unset
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from file, falling back to defaults
    pub fn load() -> Self {
        if let Some(path) = Self::get_config_path() {
            if let Ok(content) = fs::read_to_string(&path) {
                if let Ok(config) = Self::from_toml(&content) {
                    return config;
                }
            }
        }
        Self::default()
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Get config directory (`~/.cellterm`)
    pub fn config_dir() -> Option<PathBuf> {
        home_dir().map(|home| home.join(".cellterm"))
    }

    /// Get config file path
    fn get_config_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Log file path, defaulting to `~/.cellterm/cellterm.log`
    pub fn log_path(&self) -> PathBuf {
        self.log
            .file
            .clone()
            .or_else(|| Self::config_dir().map(|dir| dir.join("cellterm.log")))
            .unwrap_or_else(|| PathBuf::from("cellterm.log"))
    }

    /// Program to run: configured shell, then `$SHELL`, then the platform
    /// default
    pub fn shell_command(&self) -> String {
        if let Some(shell) = &self.shell {
            return shell.clone();
        }
        if let Ok(shell) = std::env::var("SHELL") {
            if !shell.is_empty() {
                return shell;
            }
        }
        if cfg!(windows) {
            "cmd.exe".to_string()
        } else {
            "/bin/sh".to_string()
        }
    }

    /// View size in cells for a host terminal of `host_cols` x `host_rows`
    ///
    /// Unset dimensions fill the space right of and below the origin. The
    /// result is never smaller than 1x1.
    pub fn view_size(&self, host_cols: u16, host_rows: u16) -> (u16, u16) {
        let width = self
            .view
            .width
            .unwrap_or_else(|| host_cols.saturating_sub(self.view.x));
        let height = self
            .view
            .height
            .unwrap_or_else(|| host_rows.saturating_sub(self.view.y));
        (width.max(1), height.max(1))
    }
}

/// What the command line asked for
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Run(Config),
    Help,
    Version,
}

/// Apply command-line flags on top of `config`
///
/// `args` excludes the program name.
pub fn parse_args<I>(mut config: Config, args: I) -> Result<Command, String>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        let mut value = |name: &str| {
            args.next()
                .ok_or_else(|| format!("Missing {} argument", name))
        };

        match arg.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "-v" | "--version" => return Ok(Command::Version),
            "-s" | "--shell" => {
                config.shell = Some(value("shell")?);
            }
            "-x" => {
                config.view.x = parse_number(&value("x")?)?;
            }
            "-y" => {
                config.view.y = parse_number(&value("y")?)?;
            }
            "--width" => {
                config.view.width = Some(parse_number(&value("width")?)?);
            }
            "--height" => {
                config.view.height = Some(parse_number(&value("height")?)?);
            }
            "--log-level" => {
                config.log.level = value("log level")?;
            }
            other => return Err(format!("Unknown option: {}", other)),
        }
    }

    Ok(Command::Run(config))
}

fn parse_number(s: &str) -> Result<u16, String> {
    s.parse()
        .map_err(|_| format!("Invalid number: {}", s))
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE")
        .or_else(|| std::env::var_os("HOME"))
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.term, "xterm-256color");
        assert_eq!(config.log.level, "info");
        assert_eq!(config.view, ViewConfig::default());
    }

    #[test]
    fn test_parse_toml() {
        let config = Config::from_toml(
            r#"
            shell = "/bin/zsh"

            [view]
            x = 2
            height = 10

            [log]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.shell.as_deref(), Some("/bin/zsh"));
        assert_eq!(config.term, "xterm-256color");
        assert_eq!(config.view.x, 2);
        assert_eq!(config.view.y, 0);
        assert_eq!(config.view.width, None);
        assert_eq!(config.view.height, Some(10));
        assert_eq!(config.log.level, "debug");
    }

    #[test]
    fn test_parse_toml_rejects_bad_types() {
        assert!(Config::from_toml("[view]\nx = \"left\"").is_err());
    }

    #[test]
    fn test_view_size() {
        let mut config = Config::default();
        config.view.x = 4;
        config.view.y = 2;
        assert_eq!(config.view_size(80, 24), (76, 22));

        config.view.width = Some(40);
        assert_eq!(config.view_size(80, 24), (40, 22));

        config.view.x = 100;
        config.view.width = None;
        assert_eq!(config.view_size(80, 24), (1, 22));
    }

    #[test]
    fn test_cli_overrides() {
        let base = Config::from_toml("shell = \"/bin/zsh\"").unwrap();
        let cmd = parse_args(
            base,
            args(&["-s", "/bin/bash", "-x", "3", "--height", "12", "--log-level", "trace"]),
        )
        .unwrap();

        let Command::Run(config) = cmd else {
            panic!("expected run command");
        };
        assert_eq!(config.shell.as_deref(), Some("/bin/bash"));
        assert_eq!(config.view.x, 3);
        assert_eq!(config.view.height, Some(12));
        assert_eq!(config.log.level, "trace");
    }

    #[test]
    fn test_cli_help_and_errors() {
        assert_eq!(parse_args(Config::default(), args(&["--help"])), Ok(Command::Help));
        assert_eq!(parse_args(Config::default(), args(&["-v"])), Ok(Command::Version));
        assert!(parse_args(Config::default(), args(&["-x"])).is_err());
        assert!(parse_args(Config::default(), args(&["-x", "abc"])).is_err());
        assert!(parse_args(Config::default(), args(&["--bogus"])).is_err());
    }

    #[test]
    fn test_shell_command_prefers_config() {
        let mut config = Config::default();
        config.shell = Some("/usr/bin/fish".to_string());
        assert_eq!(config.shell_command(), "/usr/bin/fish");
    }

    #[test]
    fn test_log_path_override() {
        let mut config = Config::default();
        config.log.file = Some(PathBuf::from("/tmp/x.log"));
        assert_eq!(config.log_path(), PathBuf::from("/tmp/x.log"));
    }
}
