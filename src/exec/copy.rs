// src/exec/copy.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::engine::{CompletionSignal, SignalFuture, TaskFailure};
use crate::exec::action::Action;
use crate::fs::FileSystem;
use crate::watch::patterns::{PatternSet, collect_matching_files};

/// Copies every file under `from` matching `include` into `to`, keeping
/// paths relative to `from`.
#[derive(Debug, Clone)]
pub struct CopyAction {
    fs: Arc<dyn FileSystem>,
    from: PathBuf,
    include: PatternSet,
    to: PathBuf,
}

impl CopyAction {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        from: impl Into<PathBuf>,
        include: PatternSet,
        to: impl Into<PathBuf>,
    ) -> Self {
        Self {
            fs,
            from: from.into(),
            include,
            to: to.into(),
        }
    }

    pub fn from_dir(&self) -> &Path {
        &self.from
    }

    pub fn to_dir(&self) -> &Path {
        &self.to
    }

    async fn run(&self, task: &str) -> CompletionSignal {
        let this = self.clone();
        match tokio::task::spawn_blocking(move || this.copy_all()).await {
            Ok(Ok(count)) => {
                info!(task = %task, files = count, to = ?self.to, "copied");
                CompletionSignal::Success
            }
            Ok(Err(err)) => CompletionSignal::failure(TaskFailure::io(task, format!("{err:#}"))),
            Err(join) => CompletionSignal::failure(TaskFailure::io(
                task,
                format!("copy did not complete: {join}"),
            )),
        }
    }

    fn copy_all(&self) -> Result<usize> {
        let files = collect_matching_files(self.fs.as_ref(), &self.from, &self.include)
            .with_context(|| format!("listing {}", self.from.display()))?;

        for src in &files {
            let rel = src.strip_prefix(&self.from).unwrap_or(src);
            let dest = self.to.join(rel);
            debug!(from = ?src, to = ?dest, "copy");
            self.fs.copy(src, &dest)?;
        }
        Ok(files.len())
    }
}

impl Action for CopyAction {
    fn invoke<'a>(&'a self, task: &'a str) -> SignalFuture<'a> {
        Box::pin(self.run(task))
    }

    fn describe(&self) -> String {
        format!(
            "copy {}/{{{}}} -> {}",
            self.from.display(),
            self.include.patterns().join(","),
            self.to.display()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::FailureKind;
    use crate::fs::mock::MockFileSystem;

    fn fonts(fs: Arc<MockFileSystem>) -> CopyAction {
        let include = PatternSet::new(&["**/*.{woff,woff2}".to_string()], &[]).unwrap();
        CopyAction::new(fs, "app/fonts", include, "dist/fonts")
    }

    #[tokio::test]
    async fn copies_matching_files_preserving_layout() {
        let mock = Arc::new(MockFileSystem::new());
        mock.add_file("app/fonts/a.woff", b"a");
        mock.add_file("app/fonts/bold/b.woff2", b"b");
        mock.add_file("app/fonts/LICENSE.txt", b"l");

        assert!(fonts(mock.clone()).invoke("fonts").await.is_success());

        assert_eq!(mock.contents("dist/fonts/a.woff").as_deref(), Some(&b"a"[..]));
        assert_eq!(
            mock.contents("dist/fonts/bold/b.woff2").as_deref(),
            Some(&b"b"[..])
        );
        assert!(mock.contents("dist/fonts/LICENSE.txt").is_none());
    }

    #[tokio::test]
    async fn missing_source_copies_nothing() {
        let mock = Arc::new(MockFileSystem::new());
        assert!(fonts(mock.clone()).invoke("fonts").await.is_success());
        assert!(!mock.exists(Path::new("dist/fonts")));
    }

    #[tokio::test]
    async fn copy_error_is_io_failure() {
        let mock = Arc::new(MockFileSystem::new());
        mock.add_file("app/fonts/a.woff", b"a");
        // A file where the destination directory should be.
        mock.add_file("dist/fonts", b"not a dir");

        let signal = fonts(mock).invoke("fonts").await;
        assert_eq!(signal.reasons()[0].kind, FailureKind::Io);
    }
}
