// src/watch/spec.rs

use std::path::PathBuf;
use std::time::Duration;

use regex::Regex;

use crate::config::compile_pattern;
use crate::config::model::WatcherConfig;
use crate::errors::Result;

/// Lower bound applied to every configured rebuild delay.
pub const MIN_REBUILD_DELAY: Duration = Duration::from_millis(500);

/// Clamp a delay to [`MIN_REBUILD_DELAY`].
pub fn clamp_rebuild_delay(delay: Duration) -> Duration {
    delay.max(MIN_REBUILD_DELAY)
}

/// Validated, defaulted description of one watcher.
///
/// Built once from a [`WatcherConfig`] and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct WatchSpec {
    pub label: String,
    pub extensions: Vec<String>,
    pub include_dirs: Vec<PathBuf>,
    pub ignore_dirs: Vec<PathBuf>,
    pub include_patterns: Vec<Regex>,
    pub ignore_patterns: Vec<Regex>,
    pub build_command: String,
    pub run_command: Option<String>,
    pub rebuild_delay: Duration,
    pub debug: bool,
}

impl WatchSpec {
    /// Apply defaults and compile patterns.
    ///
    /// `force_debug` comes from the `--debug` flag and overrides the
    /// per-watcher setting.
    pub fn from_config(cfg: &WatcherConfig, force_debug: bool) -> Result<Self> {
        let include_patterns = compile_all(cfg.include_patterns.as_deref())?;
        let ignore_patterns = compile_all(cfg.ignore_patterns.as_deref())?;

        let label = cfg
            .label
            .clone()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| derived_label(cfg));

        let include_dirs = match cfg.include_dirs.as_deref() {
            Some(dirs) if !dirs.is_empty() => dirs.iter().map(PathBuf::from).collect(),
            _ => vec![PathBuf::from(".")],
        };

        Ok(Self {
            label,
            extensions: cfg
                .extensions
                .iter()
                .flatten()
                .map(|e| normalize_extension(e))
                .collect(),
            include_dirs,
            ignore_dirs: cfg.ignore_dirs.iter().flatten().map(PathBuf::from).collect(),
            include_patterns,
            ignore_patterns,
            build_command: cfg.build_command.clone(),
            run_command: cfg.run_command.clone(),
            rebuild_delay: clamp_rebuild_delay(Duration::from_millis(cfg.rebuild_delay)),
            debug: cfg.debug || force_debug,
        })
    }
}

fn compile_all(patterns: Option<&[String]>) -> Result<Vec<Regex>> {
    patterns
        .unwrap_or_default()
        .iter()
        .map(|p| compile_pattern(p))
        .collect()
}

/// `go` and `.go` both mean the `.go` suffix.
fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim();
    if ext.starts_with('.') {
        ext.to_string()
    } else {
        format!(".{ext}")
    }
}

/// Label used when none is configured, e.g. `[E:[.go .mod], D:[cmd pkg]]`.
///
/// Only the filters the user actually supplied are listed.
fn derived_label(cfg: &WatcherConfig) -> String {
    let mut parts = Vec::new();
    if let Some(exts) = &cfg.extensions {
        parts.push(format!("E:[{}]", exts.join(" ")));
    }
    if let Some(dirs) = &cfg.include_dirs {
        parts.push(format!("D:[{}]", dirs.join(" ")));
    }
    if let Some(patterns) = &cfg.include_patterns {
        parts.push(format!("P:[{}]", patterns.join(" ")));
    }

    format!("[{}]", parts.join(", "))
}
