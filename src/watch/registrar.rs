// src/watch/registrar.rs

//! Recursive directory registration.
//!
//! Every directory under the include roots is subscribed individually
//! (non-recursively) so that ignored subtrees never produce notifications.
//! Registration happens once; directories created later are not picked up.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use regex::Regex;
use tracing::{debug, trace};

use crate::errors::{ObserverError, Result};
use crate::fs::FileSystem;
use crate::watch::spec::WatchSpec;

/// The "register path" half of a change-notification primitive.
pub trait Subscriber {
    /// Start receiving notifications for the direct children of `dir`.
    fn subscribe(&mut self, dir: &Path) -> anyhow::Result<()>;
}

/// Directories subscribed at construction time, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchedDirectorySet {
    dirs: Vec<PathBuf>,
}

impl WatchedDirectorySet {
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.dirs.iter().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    pub fn contains(&self, dir: &Path) -> bool {
        self.dirs.iter().any(|d| d == dir)
    }
}

/// How an `ignore_dirs` entry is compared against a directory.
#[derive(Debug, Clone)]
enum IgnoreDir {
    /// Bare name such as `node_modules`: matches any directory with that
    /// final component.
    Name(String),
    /// Anything with a separator: matches that exact directory.
    Path(PathBuf),
}

/// Walks include roots and subscribes every non-ignored directory.
pub struct Registrar<'a> {
    fs: &'a dyn FileSystem,
    ignore_dirs: Vec<IgnoreDir>,
    ignore_patterns: &'a [Regex],
    registered: Vec<PathBuf>,
    seen: HashSet<PathBuf>,
}

impl<'a> Registrar<'a> {
    pub fn new(spec: &'a WatchSpec, fs: &'a dyn FileSystem) -> Self {
        let ignore_dirs = spec
            .ignore_dirs
            .iter()
            .filter_map(|entry| resolve_ignore_dir(fs, entry))
            .collect();

        Self {
            fs,
            ignore_dirs,
            ignore_patterns: &spec.ignore_patterns,
            registered: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Register every include root of `spec` and return the resulting set.
    ///
    /// Any failure aborts the whole registration.
    pub fn register_all(
        spec: &WatchSpec,
        fs: &dyn FileSystem,
        subscriber: &mut dyn Subscriber,
    ) -> Result<WatchedDirectorySet> {
        let mut registrar = Registrar::new(spec, fs);
        for root in &spec.include_dirs {
            registrar.register_root(root, subscriber)?;
        }
        debug!(
            watcher = %spec.label,
            directories = registrar.registered.len(),
            "directory registration complete"
        );
        Ok(registrar.finish())
    }

    /// Resolve an include root to its canonical path, then register it.
    pub fn register_root(&mut self, root: &Path, subscriber: &mut dyn Subscriber) -> Result<()> {
        let resolved = self
            .fs
            .canonicalize(root)
            .map_err(|e| registration_error(root, &e))?;
        self.register_tree(&resolved, subscriber)
    }

    /// Subscribe `dir` and recurse into its subdirectories, skipping ignored
    /// directories together with everything below them.
    pub fn register_tree(&mut self, dir: &Path, subscriber: &mut dyn Subscriber) -> Result<()> {
        if self.is_ignored(dir) {
            debug!(path = ?dir, "skipping ignored directory");
            return Ok(());
        }
        if !self.seen.insert(dir.to_path_buf()) {
            return Ok(());
        }

        subscriber
            .subscribe(dir)
            .map_err(|e| registration_error(dir, &e))?;
        trace!(path = ?dir, "subscribed directory");
        self.registered.push(dir.to_path_buf());

        let entries = self
            .fs
            .read_dir(dir)
            .map_err(|e| registration_error(dir, &e))?;

        for entry in entries {
            // Symlinked directories are not followed, which also rules out
            // registration loops.
            if self.fs.is_dir(&entry) && !self.fs.is_symlink(&entry) {
                self.register_tree(&entry, subscriber)?;
            }
        }
        Ok(())
    }

    pub fn finish(self) -> WatchedDirectorySet {
        WatchedDirectorySet {
            dirs: self.registered,
        }
    }

    fn is_ignored(&self, dir: &Path) -> bool {
        let by_dir = self.ignore_dirs.iter().any(|ignore| match ignore {
            IgnoreDir::Name(name) => dir
                .file_name()
                .is_some_and(|file_name| file_name.to_string_lossy() == name.as_str()),
            IgnoreDir::Path(path) => path == dir,
        });
        if by_dir {
            return true;
        }

        let text = dir.to_string_lossy();
        self.ignore_patterns.iter().any(|re| re.is_match(&text))
    }
}

fn resolve_ignore_dir(fs: &dyn FileSystem, entry: &Path) -> Option<IgnoreDir> {
    let mut components = entry.components();
    if let (Some(Component::Normal(name)), None) = (components.next(), components.next()) {
        return Some(IgnoreDir::Name(name.to_string_lossy().into_owned()));
    }
    // A path entry that does not exist cannot match anything we register.
    fs.canonicalize(entry).ok().map(IgnoreDir::Path)
}

fn registration_error(path: &Path, err: &anyhow::Error) -> ObserverError {
    ObserverError::Registration {
        path: path.to_path_buf(),
        reason: format!("{err:#}"),
    }
}
