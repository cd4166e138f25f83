// src/exec/cached.rs

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use blake3::Hasher;
use tracing::{debug, info, warn};

use crate::cache::{TransformCache, compute_inputs_hash};
use crate::engine::{CompletionSignal, SignalFuture};
use crate::exec::action::Action;
use crate::watch::patterns::{PatternSet, collect_matching_files};

/// Skips the wrapped action while its inputs are unchanged.
///
/// The inputs are the files under `root` matching `inputs`. When their
/// aggregate hash equals the one stored after the last successful run, and
/// every declared output still exists, the inner action is not invoked.
/// Cache problems never fail the task; they only force a run.
pub struct CachedAction {
    inner: Arc<dyn Action>,
    cache: Arc<TransformCache>,
    root: PathBuf,
    inputs: PatternSet,
    outputs: Vec<PathBuf>,
}

impl std::fmt::Debug for CachedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedAction")
            .field("inner", &self.inner.describe())
            .field("root", &self.root)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .finish()
    }
}

impl CachedAction {
    pub fn new(
        inner: Arc<dyn Action>,
        cache: Arc<TransformCache>,
        root: impl Into<PathBuf>,
        inputs: PatternSet,
        outputs: Vec<PathBuf>,
    ) -> Self {
        Self {
            inner,
            cache,
            root: root.into(),
            inputs,
            outputs,
        }
    }

    /// Hash of the inputs plus the inner action's description, so editing
    /// the command invalidates the entry too.
    fn current_hash(&self) -> Result<String> {
        let fs = self.cache.fs().as_ref();
        let files = collect_matching_files(fs, &self.root, &self.inputs)?;
        let inputs = compute_inputs_hash(fs, &self.root, &files)?;

        let mut hasher = Hasher::new();
        hasher.update(self.inner.describe().as_bytes());
        hasher.update(b"\0");
        hasher.update(inputs.as_bytes());
        Ok(hasher.finalize().to_hex().to_string())
    }

    fn outputs_present(&self) -> bool {
        let fs = self.cache.fs();
        self.outputs.iter().all(|p| fs.exists(p))
    }

    /// `Some(hash)` to run and then record `hash`, `None` to skip.
    fn check(&self, task: &str) -> Option<Option<String>> {
        let hash = match self.current_hash() {
            Ok(hash) => hash,
            Err(e) => {
                warn!(task = %task, error = %e, "could not hash inputs; running");
                return Some(None);
            }
        };

        match self.cache.load(task) {
            Ok(Some(stored)) if stored == hash && self.outputs_present() => None,
            Ok(_) => Some(Some(hash)),
            Err(e) => {
                warn!(task = %task, error = %e, "could not read cache; running");
                Some(Some(hash))
            }
        }
    }

    async fn run(&self, task: &str) -> CompletionSignal {
        let Some(hash) = self.check(task) else {
            info!(task = %task, "inputs unchanged; skipped (cached)");
            return CompletionSignal::Success;
        };

        let signal = self.inner.invoke(task).await;

        if let (CompletionSignal::Success, Some(hash)) = (&signal, hash) {
            match self.cache.save(task, &hash) {
                Ok(()) => debug!(task = %task, "cache updated"),
                Err(e) => warn!(task = %task, error = %e, "could not update cache"),
            }
        }
        signal
    }
}

impl Action for CachedAction {
    fn invoke<'a>(&'a self, task: &'a str) -> SignalFuture<'a> {
        Box::pin(self.run(task))
    }

    fn describe(&self) -> String {
        format!("{} [cached on {}]", self.inner.describe(), self.inputs.patterns().join(", "))
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::engine::TaskFailure;
    use crate::exec::action::fn_action;
    use crate::fs::FileSystem;
    use crate::fs::mock::MockFileSystem;

    fn counting(
        mock: Arc<MockFileSystem>,
        calls: Arc<AtomicUsize>,
        fail: bool,
    ) -> Arc<dyn Action> {
        counting_as("imagemin", mock, calls, fail)
    }

    fn counting_as(
        description: &str,
        mock: Arc<MockFileSystem>,
        calls: Arc<AtomicUsize>,
        fail: bool,
    ) -> Arc<dyn Action> {
        fn_action(description, move || {
            let mock = mock.clone();
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                if fail {
                    return CompletionSignal::failure(TaskFailure::transform("images", "boom"));
                }
                mock.add_file("./dist/images/logo.png", b"min");
                CompletionSignal::Success
            }
        })
    }

    fn cached(mock: Arc<MockFileSystem>, inner: Arc<dyn Action>) -> CachedAction {
        let cache = Arc::new(TransformCache::new(mock, "./.buildflow/cache"));
        let inputs = PatternSet::new(&["app/images/**/*.{png,svg}".to_string()], &[]).unwrap();
        CachedAction::new(
            inner,
            cache,
            ".",
            inputs,
            vec![PathBuf::from("./dist/images")],
        )
    }

    #[tokio::test]
    async fn skips_until_inputs_change() {
        let mock = Arc::new(MockFileSystem::new());
        mock.add_file("./app/images/logo.png", b"v1");
        let calls = Arc::new(AtomicUsize::new(0));
        let action = cached(mock.clone(), counting(mock.clone(), calls.clone(), false));

        assert!(action.invoke("images").await.is_success());
        assert!(action.invoke("images").await.is_success());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        mock.add_file("./app/images/logo.png", b"v2");
        assert!(action.invoke("images").await.is_success());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn missing_outputs_force_a_run() {
        let mock = Arc::new(MockFileSystem::new());
        mock.add_file("./app/images/logo.png", b"v1");
        let calls = Arc::new(AtomicUsize::new(0));
        let action = cached(mock.clone(), counting(mock.clone(), calls.clone(), false));

        action.invoke("images").await;
        mock.remove_all(Path::new("./dist")).unwrap();
        action.invoke("images").await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failures_are_not_recorded() {
        let mock = Arc::new(MockFileSystem::new());
        mock.add_file("./app/images/logo.png", b"v1");
        let calls = Arc::new(AtomicUsize::new(0));
        let action = cached(mock.clone(), counting(mock.clone(), calls.clone(), true));

        assert!(action.invoke("images").await.is_failure());
        assert!(action.invoke("images").await.is_failure());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn editing_the_command_invalidates_the_entry() {
        let mock = Arc::new(MockFileSystem::new());
        mock.add_file("./app/images/logo.png", b"v1");
        let calls = Arc::new(AtomicUsize::new(0));

        let before = cached(
            mock.clone(),
            counting_as("imagemin --quality 80", mock.clone(), calls.clone(), false),
        );
        assert!(before.invoke("images").await.is_success());
        assert!(before.invoke("images").await.is_success());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let after = cached(
            mock.clone(),
            counting_as("imagemin --quality 60", mock.clone(), calls.clone(), false),
        );
        assert!(after.invoke("images").await.is_success());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
