// src/watch/strategy.rs

//! Change-notification backends.
//!
//! Both strategies produce the same thing: a [`Subscription`] the registrar
//! subscribes directories on, and a channel of `notify` results consumed by
//! the event loop. Only latency differs; filtering, debouncing and
//! supervision are shared.

use std::path::Path;
use std::time::Duration;

use notify::{Config, Event, PollWatcher, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::errors::Result;
use crate::watch::registrar::Subscriber;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Receiving end of a subscription: change events and fatal errors.
pub type NotifySource = mpsc::UnboundedReceiver<notify::Result<Event>>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WatchStrategy {
    /// The platform's native notification API (inotify, FSEvents, ...).
    #[default]
    Native,
    /// Periodic modification-time scan of every registered directory.
    Poll { interval: Duration },
}

impl WatchStrategy {
    /// Create a subscription whose events are forwarded into a Tokio
    /// channel.
    pub fn subscribe(self) -> Result<(Subscription, NotifySource)> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        // Called synchronously by notify on its own thread.
        let handler = move |res: notify::Result<Event>| {
            // The receiver is gone once the event loop has ended; nothing
            // left to deliver to.
            let _ = event_tx.send(res);
        };

        let inner: Box<dyn Watcher + Send> = match self {
            WatchStrategy::Native => Box::new(RecommendedWatcher::new(handler, Config::default())?),
            WatchStrategy::Poll { interval } => Box::new(PollWatcher::new(
                handler,
                Config::default().with_poll_interval(interval),
            )?),
        };

        Ok((Subscription { inner }, event_rx))
    }
}

/// Handle on the underlying `notify` watcher.
///
/// Dropping it stops notifications and closes the matching
/// [`NotifySource`].
pub struct Subscription {
    inner: Box<dyn Watcher + Send>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish()
    }
}

impl Subscriber for Subscription {
    fn subscribe(&mut self, dir: &Path) -> anyhow::Result<()> {
        self.inner.watch(dir, RecursiveMode::NonRecursive)?;
        Ok(())
    }
}
