// src/cache/hash.rs

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::debug;

use crate::fs::FileSystem;

/// Compute the hash of a single file.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file = fs
        .open_read(path)
        .with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Compute a deterministic hash over a set of input files.
///
/// Paths are sorted first, and each file contributes its path relative to
/// `root` as well as its content hash, so renaming an input changes the
/// result too.
pub fn compute_inputs_hash(fs: &dyn FileSystem, root: &Path, paths: &[PathBuf]) -> Result<String> {
    let mut sorted: Vec<&PathBuf> = paths.iter().collect();
    sorted.sort();

    let mut hasher = Hasher::new();
    for path in sorted {
        if !fs.is_file(path) {
            continue;
        }
        let rel = path.strip_prefix(root).unwrap_or(path);
        let file_hash = compute_file_hash(fs, path)?;
        hasher.update(rel.to_string_lossy().replace('\\', "/").as_bytes());
        hasher.update(b"\0");
        hasher.update(file_hash.as_bytes());
    }

    let hash = hasher.finalize().to_hex().to_string();
    debug!(hash = %hash, files = paths.len(), "computed inputs hash");
    Ok(hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn file_hash_is_blake3_of_contents() {
        let fs = MockFileSystem::new();
        fs.add_file("test.txt", b"hello world");

        let hash = compute_file_hash(&fs, Path::new("test.txt")).unwrap();
        assert_eq!(
            hash,
            "d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24"
        );
    }

    #[test]
    fn inputs_hash_ignores_order_but_not_names() {
        let fs = MockFileSystem::new();
        fs.add_file("./img/a.png", b"a");
        fs.add_file("./img/b.png", b"b");
        fs.add_file("./img/c.png", b"a");

        let root = Path::new(".");
        let ab = compute_inputs_hash(
            &fs,
            root,
            &[PathBuf::from("./img/a.png"), PathBuf::from("./img/b.png")],
        )
        .unwrap();
        let ba = compute_inputs_hash(
            &fs,
            root,
            &[PathBuf::from("./img/b.png"), PathBuf::from("./img/a.png")],
        )
        .unwrap();
        let cb = compute_inputs_hash(
            &fs,
            root,
            &[PathBuf::from("./img/c.png"), PathBuf::from("./img/b.png")],
        )
        .unwrap();

        assert_eq!(ab, ba);
        assert_ne!(ab, cb);
    }
}
