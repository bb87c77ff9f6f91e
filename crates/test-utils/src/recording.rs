use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use observer::watch::{RebuildTarget, Subscriber};

/// A rebuild target that records when it was fired instead of running
/// anything.
#[derive(Clone, Default)]
pub struct RecordingTarget {
    fired: Arc<Mutex<Vec<Instant>>>,
}

impl RecordingTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.fired.lock().unwrap().len()
    }

    pub fn fired_at(&self) -> Vec<Instant> {
        self.fired.lock().unwrap().clone()
    }
}

impl RebuildTarget for RecordingTarget {
    fn rebuild(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        let fired = Arc::clone(&self.fired);
        Box::pin(async move {
            fired.lock().unwrap().push(Instant::now());
        })
    }
}

/// A subscriber that remembers every directory it was asked to watch.
///
/// Directories listed in `fail_on` return an error instead.
#[derive(Debug, Default)]
pub struct RecordingSubscriber {
    pub subscribed: Vec<PathBuf>,
    pub fail_on: Vec<PathBuf>,
}

impl RecordingSubscriber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(dir: impl Into<PathBuf>) -> Self {
        Self {
            subscribed: Vec::new(),
            fail_on: vec![dir.into()],
        }
    }

    pub fn contains(&self, dir: impl AsRef<Path>) -> bool {
        self.subscribed.iter().any(|d| d == dir.as_ref())
    }
}

impl Subscriber for RecordingSubscriber {
    fn subscribe(&mut self, dir: &Path) -> anyhow::Result<()> {
        if self.fail_on.iter().any(|d| d == dir) {
            anyhow::bail!("refusing to watch {}", dir.display());
        }
        self.subscribed.push(dir.to_path_buf());
        Ok(())
    }
}
