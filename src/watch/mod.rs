// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Turning a [`WatcherConfig`](crate::config::WatcherConfig) into a
//!   validated [`WatchSpec`].
//! - Subscribing directory trees once, honoring ignore rules (`registrar`).
//! - Deciding which changed paths matter (`filter`).
//! - Coalescing bursts of changes into one rebuild (`debounce`).
//! - Consuming `notify` events, natively or by polling (`event_loop`,
//!   `strategy`).
//!
//! It does **not** run any commands; rebuilds are delegated to a
//! [`RebuildTarget`].

pub mod debounce;
pub mod event_loop;
pub mod filter;
pub mod registrar;
pub mod spec;
pub mod strategy;

pub use debounce::{ChangeDebouncer, RebuildTarget};
pub use event_loop::{changed_paths, is_write_or_create, EventLoop};
pub use filter::{dotted_extension, FileFilter};
pub use registrar::{Registrar, Subscriber, WatchedDirectorySet};
pub use spec::{clamp_rebuild_delay, WatchSpec, MIN_REBUILD_DELAY};
pub use strategy::{NotifySource, Subscription, WatchStrategy, DEFAULT_POLL_INTERVAL};
