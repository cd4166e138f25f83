// src/task/outputs.rs

//! Output-root overlap checks for parallel siblings.

use std::path::{Component, Path, PathBuf};

/// Normalise a declared output root for comparison.
///
/// Drops `.` components and resolves `..` lexically; no filesystem access,
/// since outputs usually do not exist yet when the graph is built.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Returns the shared root if one path contains the other.
pub fn overlap(a: &Path, b: &Path) -> Option<PathBuf> {
    let a = normalize(a);
    let b = normalize(b);

    if a.starts_with(&b) {
        Some(b)
    } else if b.starts_with(&a) {
        Some(a)
    } else {
        None
    }
}

/// Whether `path` lies strictly below `root`, compared lexically.
///
/// `root` itself, its ancestors and anything reached through `..` are not
/// within it.
pub fn is_strictly_within(root: &Path, path: &Path) -> bool {
    match normalize(path).strip_prefix(normalize(root)) {
        Ok(rest) => !rest.as_os_str().is_empty() && !rest.starts_with(".."),
        Err(_) => false,
    }
}

/// First overlapping pair between two sets of output roots.
pub fn first_overlap(left: &[PathBuf], right: &[PathBuf]) -> Option<PathBuf> {
    left.iter()
        .find_map(|l| right.iter().find_map(|r| overlap(l, r)))
}
