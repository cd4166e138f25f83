// src/cache/mod.rs

//! Transformation cache.
//!
//! Command tasks marked `cache = true` remember a content hash of their
//! inputs after each successful run; an unchanged hash lets the next
//! invocation skip the external tool. The store is one text file,
//! `<root>/<cache_dir>/hashes`, holding `task hash` lines.

pub mod hash;

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::fs::FileSystem;
use crate::types::TaskName;

pub use hash::{compute_file_hash, compute_inputs_hash};

/// Default cache directory, relative to the project root.
pub const DEFAULT_CACHE_DIR: &str = ".buildflow/cache";

const HASH_FILE_NAME: &str = "hashes";

/// On-disk store of per-task input hashes.
#[derive(Debug)]
pub struct TransformCache {
    fs: Arc<dyn FileSystem>,
    dir: PathBuf,
    // Serialises read-modify-write of the hashes file across parallel tasks.
    lock: Mutex<()>,
}

impl TransformCache {
    pub fn new(fs: Arc<dyn FileSystem>, dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            dir: dir.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    fn hash_file(&self) -> PathBuf {
        self.dir.join(HASH_FILE_NAME)
    }

    /// Stored hash for `task`, if any.
    pub fn load(&self, task: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        Ok(self.load_all()?.remove(task))
    }

    /// Record `hash` as the latest successful input hash for `task`.
    pub fn save(&self, task: &str, hash: &str) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut map = self.load_all()?;
        map.insert(task.to_string(), hash.to_string());
        self.save_all(&map)?;
        debug!(task = %task, hash = %hash, "stored input hash");
        Ok(())
    }

    /// Forget every stored hash. A missing cache directory is fine.
    pub fn clear(&self) -> io::Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        match self.fs.remove_all(&self.dir) {
            Ok(()) => {
                info!(dir = ?self.dir, "transformation cache cleared");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(dir = ?self.dir, "transformation cache already empty");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn load_all(&self) -> Result<BTreeMap<TaskName, String>> {
        let path = self.hash_file();
        if !self.fs.exists(&path) {
            return Ok(BTreeMap::new());
        }

        let contents = self
            .fs
            .read_to_string(&path)
            .with_context(|| format!("reading cache file at {:?}", path))?;

        let map = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter_map(|line| line.split_once(char::is_whitespace))
            .map(|(name, hash)| (name.to_string(), hash.trim().to_string()))
            .collect();

        Ok(map)
    }

    fn save_all(&self, map: &BTreeMap<TaskName, String>) -> Result<()> {
        let mut out = String::new();
        for (name, hash) in map {
            out.push_str(name);
            out.push(' ');
            out.push_str(hash);
            out.push('\n');
        }
        let path = self.hash_file();
        self.fs
            .write(&path, out.as_bytes())
            .with_context(|| format!("writing cache file at {:?}", path))
    }
}
