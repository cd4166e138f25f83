// src/config/assemble.rs

//! Turning a validated [`ConfigFile`] into runnable pieces.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::Regex;

use crate::cache::TransformCache;
use crate::config::model::{ConfigFile, TaskConfig, TaskConfigKind};
use crate::engine::Orchestrator;
use crate::errors::{BuildflowError, Result};
use crate::exec::{
    Action, CachedAction, CleanAction, ClearCacheAction, CommandAction, CopyAction,
};
use crate::fs::FileSystem;
use crate::task::outputs::is_strictly_within;
use crate::task::{TaskDef, TaskGraph, TaskRegistry};
use crate::types::CompositionMode;
use crate::watch::patterns::{PatternSet, WatchBinding};

/// Everything a CLI command needs from one config file.
#[derive(Debug)]
pub struct Project {
    pub orchestrator: Arc<Orchestrator>,
    pub bindings: Vec<WatchBinding>,
    pub cache: Arc<TransformCache>,
}

/// `path` if absolute, else `root.join(path)`.
pub fn resolve_path(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// Build the validated task graph, watch bindings and cache for `cfg`.
///
/// Relative paths in the config are resolved against `root`. Fails with the
/// structural errors of [`TaskGraph::build`] (notably output conflicts).
pub fn assemble(cfg: &ConfigFile, root: &Path, fs: Arc<dyn FileSystem>) -> Result<Project> {
    let cache_dir = resolve_path(root, &cfg.config.cache_dir);
    let cache = Arc::new(TransformCache::new(Arc::clone(&fs), cache_dir));

    let registry = build_registry(cfg, root, fs, Arc::clone(&cache))?;
    let graph = TaskGraph::build(registry)?;
    let orchestrator = Orchestrator::new(graph, cfg.config.sequence_policy, root);

    Ok(Project {
        orchestrator: Arc::new(orchestrator),
        bindings: build_bindings(cfg)?,
        cache,
    })
}

/// Register every configured task.
pub fn build_registry(
    cfg: &ConfigFile,
    root: &Path,
    fs: Arc<dyn FileSystem>,
    cache: Arc<TransformCache>,
) -> Result<TaskRegistry> {
    let mut registry = TaskRegistry::new();

    for (name, task) in cfg.task.iter() {
        let mut outputs: Vec<PathBuf> =
            task.outputs.iter().map(|p| resolve_path(root, p)).collect();

        let def = match task.kind(name)? {
            TaskConfigKind::Sequence(children) => {
                TaskDef::composite(name.clone(), CompositionMode::Sequence, children.to_vec())
            }
            TaskConfigKind::Parallel(children) => {
                TaskDef::composite(name.clone(), CompositionMode::Parallel, children.to_vec())
            }
            TaskConfigKind::Command(cmd) => {
                let mut action = command_action(name, cmd, task, root)?;
                if task.cache {
                    let inputs = PatternSet::new(&task.inputs, &[])?;
                    action = Arc::new(CachedAction::new(
                        action,
                        Arc::clone(&cache),
                        root,
                        inputs,
                        outputs.clone(),
                    ));
                }
                TaskDef::leaf(name.clone(), action)
            }
            TaskConfigKind::Clean(path) => {
                let path = resolve_path(root, path);
                if !is_strictly_within(root, &path) {
                    return Err(BuildflowError::ConfigError(format!(
                        "task '{name}': refusing to clean {path:?}, which is not inside {root:?}"
                    )));
                }
                // A clean task owns the tree it removes.
                if outputs.is_empty() {
                    outputs.push(path.clone());
                }
                TaskDef::leaf(name.clone(), Arc::new(CleanAction::new(Arc::clone(&fs), path)))
            }
            TaskConfigKind::Copy(copy) => {
                let include = PatternSet::new(&copy.include, &copy.exclude)?;
                let to = resolve_path(root, &copy.to);
                if outputs.is_empty() {
                    outputs.push(to.clone());
                }
                let action = CopyAction::new(
                    Arc::clone(&fs),
                    resolve_path(root, &copy.from),
                    include,
                    to,
                );
                TaskDef::leaf(name.clone(), Arc::new(action))
            }
            TaskConfigKind::ClearCache => {
                TaskDef::leaf(name.clone(), Arc::new(ClearCacheAction::new(Arc::clone(&cache))))
            }
        };

        registry.register_def(def.with_outputs(outputs))?;
    }

    Ok(registry)
}

fn command_action(
    name: &str,
    cmd: &str,
    task: &TaskConfig,
    root: &Path,
) -> Result<Arc<dyn Action>> {
    let cwd = match &task.cwd {
        Some(cwd) => resolve_path(root, cwd),
        None => root.to_path_buf(),
    };

    let mut action = CommandAction::new(cmd).with_cwd(cwd);
    for (key, value) in task.env.iter() {
        action = action.with_env(key, value);
    }
    if let Some(pattern) = &task.error_pattern {
        let regex = Regex::new(pattern).map_err(|e| {
            BuildflowError::ConfigError(format!("task '{name}' error_pattern: {e}"))
        })?;
        action = action.with_error_pattern(regex);
    }
    Ok(Arc::new(action))
}

/// Compile the `[[watch]]` bindings, in file order.
pub fn build_bindings(cfg: &ConfigFile) -> Result<Vec<WatchBinding>> {
    cfg.watch
        .iter()
        .map(|w| {
            WatchBinding::from_globs(w.task.clone(), &w.patterns, &w.exclude)
                .map_err(BuildflowError::from)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::RawConfigFile;
    use crate::fs::mock::MockFileSystem;

    fn config(src: &str) -> ConfigFile {
        let raw: RawConfigFile = toml::from_str(src).unwrap();
        ConfigFile::try_from(raw).unwrap()
    }

    #[test]
    fn builds_graph_and_bindings() {
        let cfg = config(
            r#"
            [task.clean]
            clean = "dist"

            [task.fonts]
            copy = { from = "app/fonts", to = "dist/fonts" }

            [task.styles]
            cmd = "sass app/scss:app/css"
            outputs = ["app/css"]

            [task.assets]
            parallel = ["fonts", "styles"]

            [task.build]
            sequence = ["clean", "assets"]

            [[watch]]
            patterns = ["app/scss/**/*.scss"]
            task = "styles"
            "#,
        );

        let fs = Arc::new(MockFileSystem::new());
        let project = assemble(&cfg, Path::new("."), fs).unwrap();

        let graph = project.orchestrator.graph();
        assert_eq!(graph.len(), 5);
        assert_eq!(graph.top_level(), vec!["build"]);
        assert_eq!(
            graph.effective_outputs("fonts"),
            &[PathBuf::from("./dist/fonts")]
        );
        assert_eq!(project.bindings.len(), 1);
        assert_eq!(project.bindings[0].task(), "styles");
    }

    #[test]
    fn overlapping_parallel_outputs_are_rejected() {
        let cfg = config(
            r#"
            [task.fonts]
            copy = { from = "app/fonts", to = "dist/fonts" }

            [task.images]
            cmd = "imagemin app/images --out-dir=dist"
            outputs = ["dist"]

            [task.assets]
            parallel = ["fonts", "images"]
            "#,
        );

        let fs = Arc::new(MockFileSystem::new());
        let err = assemble(&cfg, Path::new("."), fs).unwrap_err();
        assert!(matches!(err, BuildflowError::OutputConflict { .. }), "{err}");
    }

    #[cfg(unix)]
    #[test]
    fn absolute_clean_target_must_be_inside_root() {
        let outside = config("[task.clean]\nclean = \"/work\"\n");
        let fs = Arc::new(MockFileSystem::new());
        let err = assemble(&outside, Path::new("/work/site"), fs.clone()).unwrap_err();
        assert!(matches!(err, BuildflowError::ConfigError(_)), "{err}");

        let inside = config("[task.clean]\nclean = \"/work/site/dist\"\n");
        assert!(assemble(&inside, Path::new("/work/site"), fs).is_ok());
    }
}
