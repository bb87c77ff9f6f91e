// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::config::loader::default_config_path;
use crate::watch::WatchStrategy;

/// Command-line arguments for `observer`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "observer",
    version,
    about = "Rebuild and restart commands when source files change.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file: TOML, or JSON when it ends in `.json`
    /// (e.g. `observer.config.json`).
    ///
    /// Default: `Observer.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Log every build, run and kill for all watchers.
    #[arg(long)]
    pub debug: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `OBSERVER_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the watchers, but don't run any commands.
    #[arg(long)]
    pub dry_run: bool,

    /// Detect changes by periodically scanning directories instead of using
    /// native notifications.
    #[arg(long)]
    pub poll: bool,

    /// Scan interval in milliseconds when `--poll` is set.
    #[arg(long, value_name = "MS", default_value_t = 1000)]
    pub poll_interval: u64,
}

impl CliArgs {
    /// Change-notification backend selected by `--poll`/`--poll-interval`.
    pub fn strategy(&self) -> WatchStrategy {
        if self.poll {
            WatchStrategy::Poll {
                interval: Duration::from_millis(self.poll_interval.max(1)),
            }
        } else {
            WatchStrategy::Native
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
