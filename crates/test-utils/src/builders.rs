#![allow(dead_code)]

use observer::config::{ConfigFile, WatcherConfig};
use observer::watch::WatchSpec;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: ConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: ConfigFile::default(),
        }
    }

    pub fn with_init_command(mut self, cmd: &str) -> Self {
        self.config.init_commands.push(cmd.to_string());
        self
    }

    pub fn with_watcher(mut self, watcher: WatcherConfig) -> Self {
        self.config.watchers.push(watcher);
        self
    }

    pub fn build(self) -> ConfigFile {
        self.config
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `WatcherConfig`.
pub struct WatcherConfigBuilder {
    watcher: WatcherConfig,
}

impl WatcherConfigBuilder {
    pub fn new(build_command: &str) -> Self {
        Self {
            watcher: WatcherConfig {
                label: None,
                extensions: None,
                include_dirs: None,
                ignore_dirs: None,
                include_patterns: None,
                ignore_patterns: None,
                build_command: build_command.to_string(),
                run_command: None,
                rebuild_delay: 0,
                debug: false,
            },
        }
    }

    pub fn label(mut self, label: &str) -> Self {
        self.watcher.label = Some(label.to_string());
        self
    }

    pub fn extension(mut self, ext: &str) -> Self {
        push(&mut self.watcher.extensions, ext);
        self
    }

    pub fn include_dir(mut self, dir: impl AsRef<std::path::Path>) -> Self {
        push(
            &mut self.watcher.include_dirs,
            &dir.as_ref().to_string_lossy(),
        );
        self
    }

    pub fn ignore_dir(mut self, dir: impl AsRef<std::path::Path>) -> Self {
        push(
            &mut self.watcher.ignore_dirs,
            &dir.as_ref().to_string_lossy(),
        );
        self
    }

    pub fn include_pattern(mut self, pattern: &str) -> Self {
        push(&mut self.watcher.include_patterns, pattern);
        self
    }

    pub fn ignore_pattern(mut self, pattern: &str) -> Self {
        push(&mut self.watcher.ignore_patterns, pattern);
        self
    }

    pub fn run_command(mut self, cmd: &str) -> Self {
        self.watcher.run_command = Some(cmd.to_string());
        self
    }

    pub fn rebuild_delay_ms(mut self, ms: u64) -> Self {
        self.watcher.rebuild_delay = ms;
        self
    }

    pub fn debug(mut self, val: bool) -> Self {
        self.watcher.debug = val;
        self
    }

    pub fn build(self) -> WatcherConfig {
        self.watcher
    }

    /// Build and turn straight into a `WatchSpec`.
    pub fn spec(self) -> WatchSpec {
        WatchSpec::from_config(&self.watcher, false).expect("Failed to build WatchSpec from builder")
    }
}

fn push(list: &mut Option<Vec<String>>, value: &str) {
    list.get_or_insert_with(Vec::new).push(value.to_string());
}
