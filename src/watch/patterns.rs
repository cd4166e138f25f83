// src/watch/patterns.rs

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::fs::FileSystem;
use crate::types::TaskName;

/// Compiled include/exclude glob patterns.
///
/// Patterns are relative to some root directory; callers pass relative,
/// forward-slash paths (e.g. `"app/scss/main.scss"`) into [`matches`].
///
/// [`matches`]: PatternSet::matches
#[derive(Clone)]
pub struct PatternSet {
    include: GlobSet,
    exclude: Option<GlobSet>,
    sources: Vec<String>,
}

impl fmt::Debug for PatternSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternSet")
            .field("patterns", &self.sources)
            .finish_non_exhaustive()
    }
}

impl PatternSet {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        let include_set = build_globset(include).context("building include globset")?;
        let exclude_set = if exclude.is_empty() {
            None
        } else {
            Some(build_globset(exclude).context("building exclude globset")?)
        };

        Ok(Self {
            include: include_set,
            exclude: exclude_set,
            sources: include.to_vec(),
        })
    }

    /// The include patterns as written.
    pub fn patterns(&self) -> &[String] {
        &self.sources
    }

    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.include.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }
}

/// One watch binding: files matching `patterns` re-run `task`.
#[derive(Debug, Clone)]
pub struct WatchBinding {
    task: TaskName,
    patterns: PatternSet,
}

impl WatchBinding {
    pub fn new(task: impl Into<TaskName>, patterns: PatternSet) -> Self {
        Self {
            task: task.into(),
            patterns,
        }
    }

    /// Convenience constructor compiling the patterns.
    pub fn from_globs(task: impl Into<TaskName>, include: &[String], exclude: &[String]) -> Result<Self> {
        let task = task.into();
        let patterns = PatternSet::new(include, exclude)
            .with_context(|| format!("compiling watch patterns for task {task}"))?;
        Ok(Self::new(task, patterns))
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn patterns(&self) -> &PatternSet {
        &self.patterns
    }

    pub fn matches(&self, rel_path: &str) -> bool {
        self.patterns.matches(rel_path)
    }
}

/// Build a GlobSet from simple string patterns.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Collect all files under `root` whose path relative to `root` matches
/// `patterns`.
///
/// A missing `root` yields an empty list.
pub fn collect_matching_files(
    fs: &dyn FileSystem,
    root: &Path,
    patterns: &PatternSet,
) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if !fs.is_dir(root) {
        return Ok(files);
    }

    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            if fs.is_dir(&path) {
                stack.push(path);
            } else if fs.is_file(&path) {
                if let Ok(rel) = path.strip_prefix(root) {
                    let rel_str = rel.to_string_lossy().replace('\\', "/");
                    if patterns.matches(&rel_str) {
                        files.push(path);
                    }
                }
            }
        }
    }

    files.sort();
    Ok(files)
}
