// src/config/validate.rs

use std::collections::HashSet;

use regex::Regex;
use tracing::warn;

use crate::config::model::{ConfigFile, WatcherConfig};
use crate::errors::{ObserverError, Result};

/// Run semantic validation against a loaded configuration.
///
/// This checks:
/// - there is at least one watcher
/// - every watcher has a non-empty `build_command`
/// - `run_command`, when given, is not blank
/// - directory entries are not blank
/// - every include/ignore pattern is a valid regex
///
/// Duplicate labels are allowed but reported, since they make log lines
/// ambiguous.
pub fn validate_config(cfg: &ConfigFile) -> Result<()> {
    ensure_has_watchers(cfg)?;
    for (index, watcher) in cfg.watchers.iter().enumerate() {
        validate_watcher(index, watcher)?;
    }
    warn_on_duplicate_labels(cfg);
    Ok(())
}

fn ensure_has_watchers(cfg: &ConfigFile) -> Result<()> {
    if cfg.watchers.is_empty() {
        return Err(ObserverError::ConfigError(
            "config must contain at least one watcher".to_string(),
        ));
    }
    Ok(())
}

fn validate_watcher(index: usize, watcher: &WatcherConfig) -> Result<()> {
    let name = watcher
        .label
        .clone()
        .unwrap_or_else(|| format!("#{index}"));

    if watcher.build_command.trim().is_empty() {
        return Err(ObserverError::ConfigError(format!(
            "watcher '{name}' has an empty build_command"
        )));
    }

    if let Some(run) = &watcher.run_command {
        if run.trim().is_empty() {
            return Err(ObserverError::ConfigError(format!(
                "watcher '{name}' has an empty run_command (omit it instead)"
            )));
        }
    }

    for (field, dirs) in [
        ("include_dirs", &watcher.include_dirs),
        ("ignore_dirs", &watcher.ignore_dirs),
    ] {
        if dirs.iter().flatten().any(|d| d.trim().is_empty()) {
            return Err(ObserverError::ConfigError(format!(
                "watcher '{name}' has an empty entry in {field}"
            )));
        }
    }

    for pattern in watcher
        .include_patterns
        .iter()
        .chain(watcher.ignore_patterns.iter())
        .flatten()
    {
        compile_pattern(pattern)?;
    }

    Ok(())
}

/// Compile one include/ignore regex.
pub fn compile_pattern(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|source| ObserverError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

fn warn_on_duplicate_labels(cfg: &ConfigFile) {
    let mut seen = HashSet::new();
    for label in cfg.watchers.iter().filter_map(|w| w.label.as_deref()) {
        if !seen.insert(label) {
            warn!(label, "several watchers share the same label");
        }
    }
}
