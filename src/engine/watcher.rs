// src/engine/watcher.rs

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::engine::FatalSender;
use crate::errors::Result;
use crate::exec::supervisor::{ProcessSupervisor, RebuildReport};
use crate::fs::{FileSystem, RealFileSystem};
use crate::watch::debounce::{ChangeDebouncer, RebuildTarget};
use crate::watch::event_loop::EventLoop;
use crate::watch::filter::FileFilter;
use crate::watch::registrar::{Registrar, WatchedDirectorySet};
use crate::watch::spec::WatchSpec;
use crate::watch::strategy::{NotifySource, WatchStrategy};

/// One fully wired watcher: registered directories, filter, debouncer,
/// supervisor and the event loop that drives them.
///
/// Construction registers every directory and performs the initial rebuild;
/// [`spawn`](Watcher::spawn) then starts consuming notifications.
pub struct Watcher {
    spec: Arc<WatchSpec>,
    directories: WatchedDirectorySet,
    supervisor: Arc<Mutex<ProcessSupervisor>>,
    event_loop: EventLoop,
    fatal: FatalSender,
}

impl Watcher {
    /// Subscribe the include roots of `spec` on the real filesystem and run
    /// the initial rebuild.
    ///
    /// A registration failure aborts construction and nothing is built.
    pub async fn new(spec: WatchSpec, strategy: WatchStrategy, fatal: FatalSender) -> Result<Self> {
        let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
        let (mut subscription, events) = strategy.subscribe()?;
        let directories = Registrar::register_all(&spec, fs.as_ref(), &mut subscription)?;

        let mut watcher = Self::from_parts(spec, fs, events, fatal);
        watcher.directories = directories;
        watcher.event_loop.attach(subscription);

        info!(
            watcher = %watcher.label(),
            directories = watcher.directories.len(),
            ?strategy,
            "watcher registered"
        );

        watcher.rebuild_now().await;
        Ok(watcher)
    }

    /// Wire a watcher onto an existing notification source.
    ///
    /// Nothing is registered and no rebuild runs; whoever holds the sending
    /// half of `events` decides what the watcher sees.
    pub fn from_parts(
        spec: WatchSpec,
        fs: Arc<dyn FileSystem>,
        events: NotifySource,
        fatal: FatalSender,
    ) -> Self {
        let spec = Arc::new(spec);
        let supervisor = Arc::new(Mutex::new(ProcessSupervisor::new(&spec, fatal.clone())));

        let target: Arc<dyn RebuildTarget> = supervisor.clone();
        let debouncer = ChangeDebouncer::new(spec.rebuild_delay, target);
        let filter = FileFilter::new(&spec, fs);
        let event_loop = EventLoop::new(spec.label.clone(), None, events, filter, debouncer);

        Self {
            spec,
            directories: WatchedDirectorySet::default(),
            supervisor,
            event_loop,
            fatal,
        }
    }

    pub fn label(&self) -> &str {
        &self.spec.label
    }

    pub fn spec(&self) -> &WatchSpec {
        &self.spec
    }

    pub fn directories(&self) -> &WatchedDirectorySet {
        &self.directories
    }

    /// Run one build/run cycle right away, bypassing the debouncer.
    pub async fn rebuild_now(&self) -> RebuildReport {
        let mut supervisor = self.supervisor.lock().await;
        let report = supervisor.rebuild().await;
        debug!(watcher = %self.spec.label, ?report, "rebuild finished");
        report
    }

    /// Start the event loop on its own task.
    ///
    /// If the loop ends with an error, that error is reported on the fatal
    /// channel.
    pub fn spawn(self) -> WatcherHandle {
        let Self {
            spec,
            supervisor,
            event_loop,
            fatal,
            ..
        } = self;

        let task = tokio::spawn(async move {
            if let Err(err) = event_loop.run().await {
                let _ = fatal.send(err);
            }
        });

        WatcherHandle {
            label: spec.label.clone(),
            supervisor,
            task,
        }
    }
}

/// A running watcher.
pub struct WatcherHandle {
    label: String,
    supervisor: Arc<Mutex<ProcessSupervisor>>,
    task: JoinHandle<()>,
}

impl WatcherHandle {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// True once the event loop has ended.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// True while the supervised run process is alive.
    pub async fn is_running(&self) -> bool {
        self.supervisor.lock().await.is_running()
    }

    /// Stop the event loop, wait for any in-flight rebuild and kill the run
    /// process.
    pub async fn shutdown(self) {
        self.task.abort();
        let mut supervisor = self.supervisor.lock().await;
        let outcome = supervisor.shutdown().await;
        debug!(watcher = %self.label, ?outcome, "watcher stopped");
    }
}
