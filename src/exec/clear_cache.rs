// src/exec/clear_cache.rs

use std::sync::Arc;

use tracing::warn;

use crate::cache::TransformCache;
use crate::engine::{CompletionSignal, SignalFuture};
use crate::exec::action::Action;

/// Invalidate the transformation cache.
///
/// Always `Success`: a cache that cannot be cleared only costs a rebuild, so
/// problems are logged and swallowed.
pub async fn clear_cache(cache: Arc<TransformCache>, task: &str) -> CompletionSignal {
    let dir = cache.dir().to_path_buf();
    match tokio::task::spawn_blocking(move || cache.clear()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(task = %task, dir = ?dir, error = %e, "could not clear cache"),
        Err(join) => warn!(task = %task, dir = ?dir, error = %join, "cache clear did not complete"),
    }
    CompletionSignal::Success
}

#[derive(Debug, Clone)]
pub struct ClearCacheAction {
    cache: Arc<TransformCache>,
}

impl ClearCacheAction {
    pub fn new(cache: Arc<TransformCache>) -> Self {
        Self { cache }
    }
}

impl Action for ClearCacheAction {
    fn invoke<'a>(&'a self, task: &'a str) -> SignalFuture<'a> {
        Box::pin(clear_cache(Arc::clone(&self.cache), task))
    }

    fn describe(&self) -> String {
        format!("clear cache {}", self.cache.dir().display())
    }
}
