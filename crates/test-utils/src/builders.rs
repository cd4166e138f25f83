#![allow(dead_code)]

use std::path::PathBuf;

use buildflow::config::model::{
    ConfigSection, CopyConfig, DevSection, RawConfigFile, TaskConfig, WatchConfig,
};
use buildflow::config::ConfigFile;
use buildflow::errors::Result;
use buildflow::types::SequencePolicy;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                task: Default::default(),
                watch: Vec::new(),
                dev: DevSection::default(),
            },
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn with_watch(mut self, task: &str, patterns: &[&str]) -> Self {
        self.config.watch.push(WatchConfig {
            patterns: patterns.iter().map(|s| s.to_string()).collect(),
            exclude: Vec::new(),
            task: task.to_string(),
        });
        self
    }

    /// Add an exclude pattern to the most recently added watch binding.
    pub fn excluding(mut self, pattern: &str) -> Self {
        if let Some(last) = self.config.watch.last_mut() {
            last.exclude.push(pattern.to_string());
        }
        self
    }

    pub fn with_sequence_policy(mut self, policy: SequencePolicy) -> Self {
        self.config.config.sequence_policy = policy;
        self
    }

    pub fn with_cache_dir(mut self, dir: &str) -> Self {
        self.config.config.cache_dir = PathBuf::from(dir);
        self
    }

    pub fn with_serve(mut self, task: &str) -> Self {
        self.config.dev.serve = Some(task.to_string());
        self
    }

    pub fn with_startup(mut self, task: &str) -> Self {
        self.config.dev.startup.push(task.to_string());
        self
    }

    /// Validate without panicking, for tests that expect errors.
    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn cmd(cmd: &str) -> Self {
        Self::from(TaskConfig {
            cmd: Some(cmd.to_string()),
            ..TaskConfig::default()
        })
    }

    pub fn clean(path: &str) -> Self {
        Self::from(TaskConfig {
            clean: Some(PathBuf::from(path)),
            ..TaskConfig::default()
        })
    }

    pub fn copy(from: &str, include: &[&str], to: &str) -> Self {
        Self::from(TaskConfig {
            copy: Some(CopyConfig {
                from: PathBuf::from(from),
                include: include.iter().map(|s| s.to_string()).collect(),
                exclude: Vec::new(),
                to: PathBuf::from(to),
            }),
            ..TaskConfig::default()
        })
    }

    pub fn clear_cache() -> Self {
        Self::from(TaskConfig {
            clear_cache: true,
            ..TaskConfig::default()
        })
    }

    pub fn sequence(children: &[&str]) -> Self {
        Self::from(TaskConfig {
            sequence: Some(children.iter().map(|s| s.to_string()).collect()),
            ..TaskConfig::default()
        })
    }

    pub fn parallel(children: &[&str]) -> Self {
        Self::from(TaskConfig {
            parallel: Some(children.iter().map(|s| s.to_string()).collect()),
            ..TaskConfig::default()
        })
    }

    pub fn output(mut self, path: &str) -> Self {
        self.task.outputs.push(PathBuf::from(path));
        self
    }

    pub fn input(mut self, pattern: &str) -> Self {
        self.task.inputs.push(pattern.to_string());
        self
    }

    pub fn cached(mut self) -> Self {
        self.task.cache = true;
        self
    }

    pub fn error_pattern(mut self, pattern: &str) -> Self {
        self.task.error_pattern = Some(pattern.to_string());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.task.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn cwd(mut self, dir: &str) -> Self {
        self.task.cwd = Some(PathBuf::from(dir));
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}

impl From<TaskConfig> for TaskConfigBuilder {
    fn from(task: TaskConfig) -> Self {
        Self { task }
    }
}
