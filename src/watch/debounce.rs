// src/watch/debounce.rs

//! Trailing-edge debounce for rebuild triggers.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::trace;

use crate::watch::spec::clamp_rebuild_delay;

/// Something the debouncer fires once per burst.
///
/// Production code uses the process supervisor; tests can count calls.
pub trait RebuildTarget: Send + Sync + 'static {
    fn rebuild(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

#[derive(Default)]
struct TimerState {
    /// Bumped on every arm; a sleeping timer only fires if its generation is
    /// still current when it wakes.
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

/// Coalesces bursts of [`trigger`](ChangeDebouncer::trigger) calls into one
/// call of the target, `delay` after the last trigger.
///
/// All timer bookkeeping happens under one lock, so there is never more than
/// one armed timer. A timer disarms itself under that lock before it runs the
/// target, so a late trigger can only arm the next cycle, never cancel a
/// rebuild that already started.
pub struct ChangeDebouncer {
    delay: Duration,
    state: Arc<Mutex<TimerState>>,
    target: Arc<dyn RebuildTarget>,
}

impl ChangeDebouncer {
    /// `delay` is clamped to [`crate::watch::MIN_REBUILD_DELAY`].
    pub fn new(delay: Duration, target: Arc<dyn RebuildTarget>) -> Self {
        Self {
            delay: clamp_rebuild_delay(delay),
            state: Arc::new(Mutex::new(TimerState::default())),
            target,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// (Re)arm the timer.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn trigger(&self) {
        let mut state = lock(&self.state);

        if let Some(previous) = state.pending.take() {
            previous.abort();
            trace!("debounce timer re-armed");
        }

        state.generation = state.generation.wrapping_add(1);
        let generation = state.generation;

        let shared = Arc::clone(&self.state);
        let target = Arc::clone(&self.target);
        let delay = self.delay;

        state.pending = Some(tokio::spawn(async move {
            sleep(delay).await;
            {
                let mut state = lock(&shared);
                if state.generation != generation {
                    return;
                }
                // Detach ourselves; from here on nothing may abort us.
                state.pending = None;
            }
            target.rebuild().await;
        }));
    }

    /// True while a timer is armed and has not fired yet.
    pub fn is_armed(&self) -> bool {
        lock(&self.state).pending.is_some()
    }
}

impl Drop for ChangeDebouncer {
    fn drop(&mut self) {
        if let Some(pending) = lock(&self.state).pending.take() {
            pending.abort();
        }
    }
}

fn lock(state: &Mutex<TimerState>) -> MutexGuard<'_, TimerState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
