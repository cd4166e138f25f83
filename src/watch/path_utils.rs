// src/watch/path_utils.rs

use std::path::Path;

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// Tries a plain `strip_prefix` first, then again with both sides
/// canonicalized (symlinked temp dirs on macOS report `/private/var/...`).
/// A path that has already been deleted cannot be canonicalized, so for
/// removals only its parent is resolved.
///
/// Returns `None` if the path does not live under `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(to_slash(rel));
    }

    let root_canon = root.canonicalize().ok()?;

    if let Ok(path_canon) = path.canonicalize() {
        if let Ok(rel) = path_canon.strip_prefix(&root_canon) {
            return Some(to_slash(rel));
        }
    }

    let parent = path.parent()?.canonicalize().ok()?;
    let name = path.file_name()?;
    parent
        .join(name)
        .strip_prefix(&root_canon)
        .ok()
        .map(to_slash)
}

fn to_slash(rel: &Path) -> String {
    rel.to_string_lossy().replace('\\', "/")
}
