#![allow(dead_code)]

use std::path::PathBuf;

use siteflow::config::{CompositeConfig, ConfigFile, PathSpec, RawConfigFile};
use siteflow::types::{AssetCategory, CacheStorageMode, TriggerWhileRunningBehaviour};

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from the built-in defaults (`src/` → `dist/`).
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_paths(mut self, category: AssetCategory, spec: PathSpec) -> Self {
        *self.config.paths.get_mut(category) = spec;
        self
    }

    pub fn with_build_root(mut self, dir: &str) -> Self {
        self.config.config.build_root = PathBuf::from(dir);
        self
    }

    pub fn with_cache(mut self, mode: CacheStorageMode) -> Self {
        self.config.images.cache = mode;
        self
    }

    pub fn with_task_timeout_secs(mut self, secs: u64) -> Self {
        self.config.config.task_timeout_secs = secs;
        self
    }

    pub fn with_behaviour(mut self, behaviour: TriggerWhileRunningBehaviour) -> Self {
        self.config.watch.triggered_while_running_behaviour = behaviour;
        self
    }

    pub fn with_series(mut self, name: &str, members: &[&str]) -> Self {
        self.config.task.insert(
            name.to_string(),
            CompositeConfig {
                series: Some(members.iter().map(|m| m.to_string()).collect()),
                parallel: None,
            },
        );
        self
    }

    pub fn with_parallel(mut self, name: &str, members: &[&str]) -> Self {
        self.config.task.insert(
            name.to_string(),
            CompositeConfig {
                series: None,
                parallel: Some(members.iter().map(|m| m.to_string()).collect()),
            },
        );
        self
    }

    /// The raw file, for tests that expect validation to fail.
    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
