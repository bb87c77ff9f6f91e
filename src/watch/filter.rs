// src/watch/filter.rs

use std::path::Path;
use std::sync::Arc;

use regex::Regex;

use crate::fs::FileSystem;
use crate::watch::spec::WatchSpec;

/// Decides whether a changed path should trigger a rebuild.
///
/// Order matters:
/// 1. paths that vanished or are directories are rejected (events can race
///    with deletes and renames);
/// 2. ignore patterns reject, before anything else is considered;
/// 3. an allowed extension accepts;
/// 4. an include pattern accepts;
/// 5. everything else is rejected.
#[derive(Debug, Clone)]
pub struct FileFilter {
    fs: Arc<dyn FileSystem>,
    extensions: Vec<String>,
    include_patterns: Vec<Regex>,
    ignore_patterns: Vec<Regex>,
}

impl FileFilter {
    pub fn new(spec: &WatchSpec, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            extensions: spec.extensions.clone(),
            include_patterns: spec.include_patterns.clone(),
            ignore_patterns: spec.ignore_patterns.clone(),
        }
    }

    pub fn is_qualifying(&self, path: &Path) -> bool {
        if !self.fs.exists(path) || self.fs.is_dir(path) {
            return false;
        }

        let text = path.to_string_lossy();
        if self.ignore_patterns.iter().any(|re| re.is_match(&text)) {
            return false;
        }

        if let Some(ext) = dotted_extension(path) {
            if self.extensions.iter().any(|allowed| allowed == ext) {
                return true;
            }
        }

        self.include_patterns.iter().any(|re| re.is_match(&text))
    }
}

/// Suffix of the final path component starting at its last `.`.
///
/// `main.go` → `.go`, `a.tar.gz` → `.gz`, `.env` → `.env`, `Makefile` → `None`.
pub fn dotted_extension(path: &Path) -> Option<&str> {
    let name = path.file_name()?.to_str()?;
    name.rfind('.').map(|idx| &name[idx..])
}
