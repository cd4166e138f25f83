// src/watch/watcher.rs

use std::path::Path;

use anyhow::{Context, Result};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{info, trace, warn};

use crate::watch::session::PathRouter;

/// Handle for the filesystem watcher.
///
/// Keeps the underlying `RecommendedWatcher` alive. Dropping it stops file
/// watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Whether an event kind can mean file content changed.
pub fn is_change_event(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Any | EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

/// Observe `root` recursively and hand every changed path to `router`.
///
/// The notify callback runs on the watcher's own thread; routing only does
/// glob matching and unbounded channel sends, so it never blocks.
pub fn spawn_watcher(root: &Path, router: PathRouter) -> Result<WatcherHandle> {
    let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if !is_change_event(&event.kind) {
                    trace!(kind = ?event.kind, "ignoring non-content event");
                    return;
                }
                for path in &event.paths {
                    router.route(path);
                }
            }
            Err(err) => {
                warn!(error = %err, "file watch error");
            }
        },
        Config::default(),
    )
    .context("creating filesystem watcher")?;

    watcher
        .watch(&root, RecursiveMode::Recursive)
        .with_context(|| format!("watching {:?}", root))?;

    info!("file watcher started on {:?}", root);

    Ok(WatcherHandle { _inner: watcher })
}
