// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::cache::DEFAULT_CACHE_DIR;
use crate::errors::{BuildflowError, Result};
use crate::types::{SequencePolicy, TaskName};

/// Configuration exactly as deserialized from TOML, before validation.
///
/// ```toml
/// [config]
/// sequence_policy = "fail_fast"
///
/// [task.styles]
/// cmd = "sass app/scss:app/css"
/// outputs = ["app/css"]
///
/// [task.build]
/// sequence = ["clean", "assets"]
///
/// [[watch]]
/// patterns = ["app/scss/**/*.scss"]
/// task = "styles"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    /// All tasks from `[task.<name>]`, keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<TaskName, TaskConfig>,

    /// `[[watch]]` bindings, in file order.
    #[serde(default)]
    pub watch: Vec<WatchConfig>,

    #[serde(default)]
    pub dev: DevSection,
}

/// Validated configuration. Only obtainable through `TryFrom<RawConfigFile>`
/// (see `config::validate`).
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub task: BTreeMap<TaskName, TaskConfig>,
    pub watch: Vec<WatchConfig>,
    pub dev: DevSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            config: raw.config,
            task: raw.task,
            watch: raw.watch,
            dev: raw.dev,
        }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigSection {
    /// `"fail_fast"` (default) or `"continue"`.
    #[serde(default)]
    pub sequence_policy: SequencePolicy,

    /// Transformation cache directory, relative to the project root.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Main build output directory. Only shown by `--dry-run`.
    #[serde(default)]
    pub output_root: Option<PathBuf>,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CACHE_DIR)
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            sequence_policy: SequencePolicy::default(),
            cache_dir: default_cache_dir(),
            output_root: None,
        }
    }
}

/// `[task.<name>]` section.
///
/// Exactly one of `cmd`, `clean`, `copy`, `clear_cache`, `sequence`,
/// `parallel` must be set; [`TaskConfig::kind`] enforces that.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskConfig {
    /// Shell command to execute.
    #[serde(default)]
    pub cmd: Option<String>,

    /// Directory (or file) to remove.
    #[serde(default)]
    pub clean: Option<PathBuf>,

    #[serde(default)]
    pub copy: Option<CopyConfig>,

    #[serde(default)]
    pub clear_cache: bool,

    /// Children run one after another.
    #[serde(default)]
    pub sequence: Option<Vec<TaskName>>,

    /// Children run concurrently.
    #[serde(default)]
    pub parallel: Option<Vec<TaskName>>,

    /// Declared output roots (relative to the project root).
    #[serde(default)]
    pub outputs: Vec<PathBuf>,

    /// Input globs hashed by the transformation cache.
    #[serde(default)]
    pub inputs: Vec<String>,

    /// Skip `cmd` while `inputs` are unchanged.
    #[serde(default)]
    pub cache: bool,

    /// Regex selecting output lines to report when `cmd` fails.
    #[serde(default)]
    pub error_pattern: Option<String>,

    /// Extra environment variables for `cmd`.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Working directory for `cmd`, relative to the project root.
    #[serde(default)]
    pub cwd: Option<PathBuf>,
}

/// The single kind a task config declares.
#[derive(Debug, Clone, Copy)]
pub enum TaskConfigKind<'a> {
    Command(&'a str),
    Clean(&'a Path),
    Copy(&'a CopyConfig),
    ClearCache,
    Sequence(&'a [TaskName]),
    Parallel(&'a [TaskName]),
}

impl TaskConfig {
    /// Classify this task. `name` is only used for error messages.
    pub fn kind(&self, name: &str) -> Result<TaskConfigKind<'_>> {
        let mut kinds = Vec::new();
        if let Some(cmd) = &self.cmd {
            kinds.push(("cmd", TaskConfigKind::Command(cmd)));
        }
        if let Some(path) = &self.clean {
            kinds.push(("clean", TaskConfigKind::Clean(path)));
        }
        if let Some(copy) = &self.copy {
            kinds.push(("copy", TaskConfigKind::Copy(copy)));
        }
        if self.clear_cache {
            kinds.push(("clear_cache", TaskConfigKind::ClearCache));
        }
        if let Some(children) = &self.sequence {
            kinds.push(("sequence", TaskConfigKind::Sequence(children)));
        }
        if let Some(children) = &self.parallel {
            kinds.push(("parallel", TaskConfigKind::Parallel(children)));
        }

        match kinds.as_slice() {
            [(_, kind)] => Ok(*kind),
            [] => Err(BuildflowError::ConfigError(format!(
                "task '{name}' must set one of cmd, clean, copy, clear_cache, sequence, parallel"
            ))),
            many => {
                let keys: Vec<&str> = many.iter().map(|(key, _)| *key).collect();
                Err(BuildflowError::ConfigError(format!(
                    "task '{name}' sets more than one kind: {}",
                    keys.join(", ")
                )))
            }
        }
    }

    /// Child task names for composites, empty for leaves.
    pub fn children(&self) -> &[TaskName] {
        match (&self.sequence, &self.parallel) {
            (Some(children), _) | (None, Some(children)) => children,
            (None, None) => &[],
        }
    }
}

/// `copy = { from = "app/fonts", include = ["**/*"], to = "dist/fonts" }`
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CopyConfig {
    pub from: PathBuf,
    #[serde(default = "default_copy_include")]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    pub to: PathBuf,
}

fn default_copy_include() -> Vec<String> {
    vec!["**/*".to_string()]
}

/// One `[[watch]]` binding.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchConfig {
    /// Globs relative to the project root.
    pub patterns: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    pub task: TaskName,
}

/// `[dev]` section, used by `watch`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DevSection {
    /// Long-lived development server task, run alongside the watchers.
    #[serde(default)]
    pub serve: Option<TaskName>,

    /// Tasks run once, in parallel, when the watch session starts.
    #[serde(default)]
    pub startup: Vec<TaskName>,
}
