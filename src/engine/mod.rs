// src/engine/mod.rs

//! Per-watcher wiring.
//!
//! A [`Watcher`] owns one registrar result, filter, debouncer, event loop and
//! process supervisor for a single [`WatchSpec`](crate::watch::WatchSpec).
//! Watchers share nothing with each other except the fatal channel, through
//! which unrecoverable errors reach the host.

pub mod watcher;

use tokio::sync::mpsc;

use crate::errors::ObserverError;

pub use watcher::{Watcher, WatcherHandle};

/// Sending half of the host's fatal-error channel.
pub type FatalSender = mpsc::UnboundedSender<ObserverError>;

/// Receiving half of the host's fatal-error channel.
pub type FatalReceiver = mpsc::UnboundedReceiver<ObserverError>;

/// Create the channel every watcher of one host reports fatal errors on.
pub fn fatal_channel() -> (FatalSender, FatalReceiver) {
    mpsc::unbounded_channel()
}
