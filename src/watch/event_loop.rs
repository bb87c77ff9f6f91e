// src/watch/event_loop.rs

use std::path::PathBuf;

use notify::Event;
use notify::event::{EventKind, MetadataKind, ModifyKind, RenameMode};
use tracing::{debug, error, trace};

use crate::errors::{ObserverError, Result};
use crate::watch::debounce::ChangeDebouncer;
use crate::watch::filter::FileFilter;
use crate::watch::strategy::{NotifySource, Subscription};

/// True for content writes and file creations.
///
/// A file renamed into place counts as created under its new name, which is
/// how editors that save through a temporary file show up. Removals, the
/// old name of a rename, access and attribute-only changes never trigger a
/// rebuild. The polling backend reports writes as a write-time metadata
/// change, so that one counts too.
pub fn is_write_or_create(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) | EventKind::Any => true,
        EventKind::Modify(ModifyKind::Data(_))
        | EventKind::Modify(ModifyKind::Any)
        | EventKind::Modify(ModifyKind::Metadata(MetadataKind::WriteTime))
        | EventKind::Modify(ModifyKind::Name(RenameMode::To | RenameMode::Both)) => true,
        _ => false,
    }
}

/// The paths of `event` that were written or created.
///
/// A `Both` rename carries `[from, to]`; only the destination counts.
pub fn changed_paths(event: &Event) -> &[PathBuf] {
    if !is_write_or_create(&event.kind) {
        return &[];
    }
    match event.kind {
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            event.paths.get(1..).unwrap_or_default()
        }
        _ => &event.paths,
    }
}

/// Consumes notifications for one watcher and feeds qualifying changes into
/// its debouncer.
pub struct EventLoop {
    label: String,
    /// Kept alive for as long as the loop runs and released when it ends.
    subscription: Option<Subscription>,
    events: NotifySource,
    filter: FileFilter,
    debouncer: ChangeDebouncer,
}

impl EventLoop {
    pub fn new(
        label: impl Into<String>,
        subscription: Option<Subscription>,
        events: NotifySource,
        filter: FileFilter,
        debouncer: ChangeDebouncer,
    ) -> Self {
        Self {
            label: label.into(),
            subscription,
            events,
            filter,
            debouncer,
        }
    }

    /// Hand over the subscription that feeds `events`.
    pub fn attach(&mut self, subscription: Subscription) {
        self.subscription = Some(subscription);
    }

    /// Run until the notification source closes.
    ///
    /// A subscription error ends the loop with
    /// [`ObserverError::WatchSubscription`]; there is no reconnection.
    pub async fn run(mut self) -> Result<()> {
        while let Some(res) = self.events.recv().await {
            match res {
                Ok(event) => {
                    self.handle_event(&event);
                }
                Err(source) => {
                    error!(watcher = %self.label, error = %source, "watcher error");
                    self.subscription.take();
                    return Err(ObserverError::WatchSubscription {
                        watcher: self.label,
                        source,
                    });
                }
            }
        }

        debug!(watcher = %self.label, "notification source closed; event loop finished");
        Ok(())
    }

    /// Filter one event and arm the debouncer if any of its paths qualify.
    ///
    /// Returns whether the debouncer was triggered.
    pub fn handle_event(&self, event: &Event) -> bool {
        let paths = changed_paths(event);
        if paths.is_empty() {
            trace!(watcher = %self.label, kind = ?event.kind, "ignoring event kind");
            return false;
        }

        let mut qualifying = false;
        for path in paths {
            if self.filter.is_qualifying(path) {
                debug!(watcher = %self.label, path = ?path, "qualifying change");
                qualifying = true;
            } else {
                trace!(watcher = %self.label, path = ?path, "change filtered out");
            }
        }

        if qualifying {
            self.debouncer.trigger();
        }
        qualifying
    }
}
