// src/config/validate.rs

use std::path::Path;

use regex::Regex;

use crate::config::model::{ConfigFile, RawConfigFile, TaskConfigKind};
use crate::errors::{BuildflowError, Result};
use crate::task::detect_cycle;
use crate::task::outputs::is_strictly_within;
use crate::watch::patterns::PatternSet;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = BuildflowError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_task_kinds(cfg)?;
    validate_references(cfg)?;
    validate_composition(cfg)?;
    validate_patterns(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(BuildflowError::ConfigError(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_task_kinds(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        let kind = task.kind(name)?;
        let is_command = matches!(kind, TaskConfigKind::Command(_));

        if let TaskConfigKind::Clean(path) = kind {
            if path.is_relative() && !is_strictly_within(Path::new(""), path) {
                return Err(BuildflowError::ConfigError(format!(
                    "task '{name}': refusing to clean {path:?}, which is not inside the project root"
                )));
            }
        }

        if task.cache && !is_command {
            return Err(BuildflowError::ConfigError(format!(
                "task '{name}': `cache` only applies to `cmd` tasks"
            )));
        }
        if task.cache && task.inputs.is_empty() {
            return Err(BuildflowError::ConfigError(format!(
                "task '{name}': `cache = true` needs at least one `inputs` glob"
            )));
        }
        if !is_command
            && (task.error_pattern.is_some() || !task.env.is_empty() || task.cwd.is_some())
        {
            return Err(BuildflowError::ConfigError(format!(
                "task '{name}': `error_pattern`, `env` and `cwd` only apply to `cmd` tasks"
            )));
        }
    }
    Ok(())
}

fn validate_references(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        for child in task.children() {
            if child == name {
                return Err(BuildflowError::Cycle(format!(
                    "task '{name}' cannot contain itself"
                )));
            }
            if !cfg.task.contains_key(child) {
                return Err(BuildflowError::UnknownTask(format!(
                    "{child} (child of '{name}')"
                )));
            }
        }
    }

    for (i, watch) in cfg.watch.iter().enumerate() {
        if !cfg.task.contains_key(&watch.task) {
            return Err(BuildflowError::UnknownTask(format!(
                "{} (bound by [[watch]] #{})",
                watch.task,
                i + 1
            )));
        }
    }

    let dev_tasks = cfg.dev.serve.iter().chain(cfg.dev.startup.iter());
    for task in dev_tasks {
        if !cfg.task.contains_key(task) {
            return Err(BuildflowError::UnknownTask(format!("{task} (named in [dev])")));
        }
    }

    Ok(())
}

fn validate_composition(cfg: &RawConfigFile) -> Result<()> {
    let nodes = cfg.task.keys().map(String::as_str);
    let edges = cfg.task.iter().flat_map(|(name, task)| {
        task.children()
            .iter()
            .map(move |child| (name.as_str(), child.as_str()))
    });
    detect_cycle(nodes, edges)?;
    Ok(())
}

fn validate_patterns(cfg: &RawConfigFile) -> Result<()> {
    for (i, watch) in cfg.watch.iter().enumerate() {
        if watch.patterns.is_empty() {
            return Err(BuildflowError::ConfigError(format!(
                "[[watch]] #{} for task '{}' has no patterns",
                i + 1,
                watch.task
            )));
        }
        PatternSet::new(&watch.patterns, &watch.exclude).map_err(|e| {
            BuildflowError::ConfigError(format!("[[watch]] #{}: {e:#}", i + 1))
        })?;
    }

    for (name, task) in cfg.task.iter() {
        if !task.inputs.is_empty() {
            PatternSet::new(&task.inputs, &[]).map_err(|e| {
                BuildflowError::ConfigError(format!("task '{name}' inputs: {e:#}"))
            })?;
        }
        if let Some(copy) = &task.copy {
            PatternSet::new(&copy.include, &copy.exclude).map_err(|e| {
                BuildflowError::ConfigError(format!("task '{name}' copy: {e:#}"))
            })?;
        }
        if let Some(pattern) = &task.error_pattern {
            Regex::new(pattern).map_err(|e| {
                BuildflowError::ConfigError(format!("task '{name}' error_pattern: {e}"))
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_src: &str) -> Result<ConfigFile> {
        let raw: RawConfigFile = toml::from_str(toml_src)?;
        ConfigFile::try_from(raw)
    }

    #[test]
    fn accepts_a_small_pipeline() {
        let cfg = parse(
            r#"
            [task.styles]
            cmd = "sass app/scss:app/css"
            error_pattern = "(?i)error"

            [task.bundle]
            cmd = "esbuild app/js/main.js --outdir=dist/js"

            [task.build]
            sequence = ["styles", "bundle"]

            [[watch]]
            patterns = ["app/scss/**/*.scss"]
            task = "styles"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.task.len(), 3);
        assert_eq!(cfg.watch.len(), 1);
    }

    #[test]
    fn rejects_empty_config() {
        let err = parse("").unwrap_err();
        assert!(matches!(err, BuildflowError::ConfigError(_)));
    }

    #[test]
    fn rejects_two_kinds() {
        let err = parse(
            r#"
            [task.x]
            cmd = "true"
            clean = "dist"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("cmd, clean"), "{err}");
    }

    #[test]
    fn rejects_unknown_child_and_watch_target() {
        let err = parse(
            r#"
            [task.build]
            parallel = ["lint"]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, BuildflowError::UnknownTask(_)));

        let err = parse(
            r#"
            [task.lint]
            cmd = "eslint app/js"

            [[watch]]
            patterns = ["app/js/**/*.js"]
            task = "bundle"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, BuildflowError::UnknownTask(_)));
    }

    #[test]
    fn rejects_cycles() {
        let err = parse(
            r#"
            [task.a]
            sequence = ["b"]

            [task.b]
            parallel = ["a"]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, BuildflowError::Cycle(_)));
    }

    #[test]
    fn rejects_bad_regex_and_glob() {
        let err = parse(
            r#"
            [task.styles]
            cmd = "sass"
            error_pattern = "("
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("error_pattern"));

        let err = parse(
            r#"
            [task.styles]
            cmd = "sass"

            [[watch]]
            patterns = ["app/[scss"]
            task = "styles"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("[[watch]] #1"));
    }

    #[test]
    fn cache_requires_inputs() {
        let err = parse(
            r#"
            [task.images]
            cmd = "imagemin"
            cache = true
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("inputs"));
    }

    #[test]
    fn rejects_clean_of_root_or_outside_it() {
        for target in [".", "", "..", "./", "dist/../..", "../site/dist"] {
            let src = format!("[task.clean]\nclean = {target:?}\n");
            let err = parse(&src).unwrap_err();
            assert!(
                matches!(err, BuildflowError::ConfigError(ref m) if m.contains("refusing to clean")),
                "{target:?}: {err}"
            );
        }
        assert!(parse("[task.clean]\nclean = \"dist/../build\"\n").is_ok());
    }
}
