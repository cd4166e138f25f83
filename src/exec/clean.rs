// src/exec/clean.rs

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::engine::{CompletionSignal, SignalFuture, TaskFailure};
use crate::exec::action::Action;
use crate::fs::FileSystem;

/// Remove the directory tree (or file) at `path`.
///
/// Idempotent: a missing path is `Success`. Any other error is an `Io`
/// failure attributed to `task`.
pub async fn clean(fs: Arc<dyn FileSystem>, path: &Path, task: &str) -> CompletionSignal {
    let target = path.to_path_buf();
    let result = tokio::task::spawn_blocking(move || fs.remove_all(&target)).await;

    match result {
        Ok(Ok(())) => {
            info!(task = %task, path = ?path, "removed");
            CompletionSignal::Success
        }
        Ok(Err(e)) if e.kind() == io::ErrorKind::NotFound => {
            debug!(task = %task, path = ?path, "nothing to clean");
            CompletionSignal::Success
        }
        Ok(Err(e)) => CompletionSignal::failure(TaskFailure::io(
            task,
            format!("removing {}: {e}", path.display()),
        )),
        Err(join) => CompletionSignal::failure(TaskFailure::io(
            task,
            format!("clean of {} did not complete: {join}", path.display()),
        )),
    }
}

/// Leaf action wrapping [`clean`].
#[derive(Debug, Clone)]
pub struct CleanAction {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
}

impl CleanAction {
    pub fn new(fs: Arc<dyn FileSystem>, path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Action for CleanAction {
    fn invoke<'a>(&'a self, task: &'a str) -> SignalFuture<'a> {
        Box::pin(clean(Arc::clone(&self.fs), &self.path, task))
    }

    fn describe(&self) -> String {
        format!("clean {}", self.path.display())
    }
}
