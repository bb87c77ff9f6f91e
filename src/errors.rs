// src/errors.rs

//! Crate-wide error type.
//!
//! Construction errors are returned to the caller. The fatal kinds
//! (`KillFailed`, `UnexpectedExit`, `WatchSubscription`) are produced by the
//! running watchers and delivered to the host over the fatal channel
//! (see [`crate::engine::FatalSender`]).

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ObserverError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("file watcher error: {0}")]
    NotifyError(#[from] notify::Error),

    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("failed to register {path:?} for change notification: {reason}")]
    Registration { path: PathBuf, reason: String },

    #[error("init command '{command}' failed: {reason}")]
    InitCommandFailed { command: String, reason: String },

    #[error("{watcher} - error killing previous run command: {source}")]
    KillFailed {
        watcher: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{watcher} - run command '{command}' exited unexpectedly: {status}")]
    UnexpectedExit {
        watcher: String,
        command: String,
        status: String,
    },

    #[error("{watcher} - watcher error: {source}")]
    WatchSubscription {
        watcher: String,
        #[source]
        source: notify::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ObserverError {
    /// True for the kinds that terminate the host when raised by a running
    /// watcher.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ObserverError::KillFailed { .. }
                | ObserverError::UnexpectedExit { .. }
                | ObserverError::WatchSubscription { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ObserverError>;
