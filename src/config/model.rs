// src/config/model.rs

use serde::Deserialize;

/// Top-level configuration as read from a TOML or JSON file.
///
/// ```toml
/// init_commands = ["go mod download"]
///
/// [[watchers]]
/// label = "api"
/// extensions = [".go"]
/// ignore_dirs = ["vendor"]
/// build_command = "go build -o bin/api ./cmd/api"
/// run_command = "./bin/api"
/// rebuild_delay = 750
/// ```
///
/// The JSON layout uses the same field names.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ConfigFile {
    /// Shell commands run once, in order, before any watcher starts.
    #[serde(default)]
    pub init_commands: Vec<String>,

    /// One entry per independent watcher.
    #[serde(default)]
    pub watchers: Vec<WatcherConfig>,
}

/// A single `[[watchers]]` entry.
///
/// Everything except `build_command` is optional; defaults are applied when
/// the entry is turned into a [`crate::watch::WatchSpec`].
#[derive(Debug, Clone, Deserialize, Default)]
pub struct WatcherConfig {
    /// Name used in log lines. Derived from the filters when absent.
    #[serde(default)]
    pub label: Option<String>,

    /// Dotted file suffixes, e.g. `".go"`. Matched exactly.
    #[serde(default)]
    pub extensions: Option<Vec<String>>,

    /// Roots to register recursively. Defaults to `["."]`.
    #[serde(default)]
    pub include_dirs: Option<Vec<String>>,

    /// Directories skipped together with their whole subtree, matched by
    /// bare name or by path.
    #[serde(default)]
    pub ignore_dirs: Option<Vec<String>>,

    /// Regexes matched against the full path of a changed file.
    #[serde(default)]
    pub include_patterns: Option<Vec<String>>,

    /// Regexes matched against full paths; a match always wins over
    /// extensions and include patterns.
    #[serde(default)]
    pub ignore_patterns: Option<Vec<String>>,

    /// Shell line run on every rebuild.
    pub build_command: String,

    /// Optional long-lived shell line restarted after every build.
    #[serde(default)]
    pub run_command: Option<String>,

    /// Quiet period in milliseconds. Values below 500 are raised to 500.
    #[serde(default)]
    pub rebuild_delay: u64,

    /// Log every build/run invocation and kill.
    #[serde(default)]
    pub debug: bool,
}
