// src/watch/session.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::{CompletionSignal, Orchestrator, SignalFuture};
use crate::types::TaskName;
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::WatchBinding;
use crate::watch::trigger::{CompletionDecision, EventDecision, TriggerState};
use crate::watch::watcher::{WatcherHandle, spawn_watcher};

/// Result of one watch-triggered invocation, for observers.
#[derive(Debug, Clone)]
pub struct BindingOutcome {
    /// Index of the binding in the order it was registered.
    pub binding: usize,
    pub task: TaskName,
    pub signal: CompletionSignal,
}

/// Routes changed paths to the bindings whose patterns match.
///
/// Cheap to clone and fully synchronous, so it can be called straight from
/// the `notify` callback thread.
#[derive(Clone)]
pub struct PathRouter {
    root: PathBuf,
    bindings: Arc<Vec<WatchBinding>>,
    senders: Arc<Vec<mpsc::UnboundedSender<()>>>,
}

impl std::fmt::Debug for PathRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathRouter")
            .field("root", &self.root)
            .field("bindings", &self.bindings.len())
            .finish()
    }
}

impl PathRouter {
    /// Deliver one changed path. Returns how many bindings it triggered.
    ///
    /// Relative paths are taken as relative to the project root; absolute
    /// ones are relativised against it first.
    pub fn route(&self, path: &Path) -> usize {
        let rel = if path.is_relative() {
            let s = path.to_string_lossy().replace('\\', "/");
            s.trim_start_matches("./").to_string()
        } else {
            match relative_str(&self.root, path) {
                Some(s) => s,
                None => {
                    debug!(?path, root = ?self.root, "event outside project root; ignoring");
                    return 0;
                }
            }
        };

        let mut triggered = 0;
        for (binding, tx) in self.bindings.iter().zip(self.senders.iter()) {
            if binding.matches(&rel) {
                debug!(path = %rel, task = %binding.task(), "watch match");
                if tx.send(()).is_ok() {
                    triggered += 1;
                }
            }
        }
        triggered
    }
}

/// A running set of watch bindings.
///
/// Lifecycle: [`start`](WatchSession::start) spawns one worker per binding;
/// [`watch_filesystem`](WatchSession::watch_filesystem) optionally attaches
/// a real filesystem watcher; [`stop`](WatchSession::stop) tears everything
/// down. Failures of bound tasks are reported and never end the session.
pub struct WatchSession {
    root: PathBuf,
    router: PathRouter,
    workers: Vec<JoinHandle<()>>,
    watcher: Option<WatcherHandle>,
}

impl std::fmt::Debug for WatchSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchSession")
            .field("root", &self.root)
            .field("workers", &self.workers.len())
            .field("watching_fs", &self.watcher.is_some())
            .finish()
    }
}

impl WatchSession {
    /// Spawn one worker per binding. Must be called inside a Tokio runtime.
    pub fn start(orchestrator: Arc<Orchestrator>, bindings: Vec<WatchBinding>) -> Self {
        Self::start_with_reporter(orchestrator, bindings, None)
    }

    /// Like [`start`](Self::start), additionally sending every outcome to
    /// `reporter`.
    pub fn start_with_reporter(
        orchestrator: Arc<Orchestrator>,
        bindings: Vec<WatchBinding>,
        reporter: Option<mpsc::UnboundedSender<BindingOutcome>>,
    ) -> Self {
        let root = orchestrator.root().to_path_buf();
        let root = root.canonicalize().unwrap_or(root);

        let mut senders = Vec::with_capacity(bindings.len());
        let mut workers = Vec::with_capacity(bindings.len());

        for (index, binding) in bindings.iter().enumerate() {
            let (tx, rx) = mpsc::unbounded_channel::<()>();
            senders.push(tx);
            workers.push(tokio::spawn(binding_worker(
                index,
                binding.task().to_string(),
                Arc::clone(&orchestrator),
                rx,
                reporter.clone(),
            )));
        }

        info!(bindings = bindings.len(), root = ?root, "watch session started");

        let router = PathRouter {
            root: root.clone(),
            bindings: Arc::new(bindings),
            senders: Arc::new(senders),
        };

        Self {
            root,
            router,
            workers,
            watcher: None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Inject a changed path, as the filesystem watcher would.
    pub fn notify_path(&self, path: impl AsRef<Path>) -> usize {
        self.router.route(path.as_ref())
    }

    /// Start observing the project root recursively with `notify`.
    pub fn watch_filesystem(&mut self) -> Result<()> {
        if self.watcher.is_none() {
            self.watcher = Some(spawn_watcher(&self.root, self.router.clone())?);
        }
        Ok(())
    }

    /// Tear the session down.
    ///
    /// Stops the filesystem watcher, lets every in-flight invocation finish
    /// (pending re-runs are dropped) and waits for the workers to exit.
    pub async fn stop(self) {
        let Self {
            router, workers, watcher, ..
        } = self;

        drop(watcher);
        drop(router);

        for handle in workers {
            if let Err(e) = handle.await {
                warn!(error = %e, "watch worker ended abnormally");
            }
        }
        info!("watch session stopped");
    }
}

/// Await the in-flight invocation, or never resolve if there is none.
async fn wait_in_flight(in_flight: &mut Option<SignalFuture<'static>>) -> CompletionSignal {
    match in_flight {
        Some(fut) => fut.await,
        None => std::future::pending().await,
    }
}

async fn binding_worker(
    index: usize,
    task: TaskName,
    orchestrator: Arc<Orchestrator>,
    mut events: mpsc::UnboundedReceiver<()>,
    reporter: Option<mpsc::UnboundedSender<BindingOutcome>>,
) {
    let mut state = TriggerState::new();
    let mut in_flight: Option<SignalFuture<'static>> = None;
    let mut closed = false;

    loop {
        tokio::select! {
            // Events already queued count as arriving during the current run.
            biased;

            event = events.recv(), if !closed => match event {
                Some(()) => match state.on_event() {
                    EventDecision::Start => {
                        info!(task = %task, binding = index, "change detected; running task");
                        in_flight = Some(orchestrator.invoke_owned(task.clone()));
                    }
                    EventDecision::QueueRerun => {
                        debug!(task = %task, binding = index, "task busy; re-run queued");
                    }
                    EventDecision::Coalesced => {
                        debug!(
                            task = %task,
                            binding = index,
                            coalesced = state.coalesced(),
                            "re-run already queued; event coalesced"
                        );
                    }
                },
                None => {
                    closed = true;
                    if in_flight.is_none() {
                        break;
                    }
                }
            },

            signal = wait_in_flight(&mut in_flight) => {
                in_flight = None;
                report(index, &task, &signal, reporter.as_ref());

                match state.on_complete() {
                    _ if closed => break,
                    CompletionDecision::Rerun => {
                        info!(task = %task, binding = index, "re-running task for queued changes");
                        in_flight = Some(orchestrator.invoke_owned(task.clone()));
                    }
                    CompletionDecision::Idle => {}
                }
            }
        }
    }

    debug!(task = %task, binding = index, "watch worker finished");
}

fn report(
    index: usize,
    task: &str,
    signal: &CompletionSignal,
    reporter: Option<&mpsc::UnboundedSender<BindingOutcome>>,
) {
    match signal {
        CompletionSignal::Success => {
            info!(task = %task, binding = index, "watch run succeeded");
        }
        CompletionSignal::Failure(reasons) => {
            for reason in reasons {
                warn!(
                    task = %task,
                    binding = index,
                    failed = %reason.task,
                    kind = %reason.kind,
                    "{}",
                    reason.message
                );
            }
            warn!(task = %task, binding = index, "watch run failed; still watching");
        }
    }

    if let Some(tx) = reporter {
        let _ = tx.send(BindingOutcome {
            binding: index,
            task: task.to_string(),
            signal: signal.clone(),
        });
    }
}
