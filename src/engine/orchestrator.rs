// src/engine/orchestrator.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::engine::combinators::{parallel, sequence};
use crate::engine::{CompletionSignal, SignalFuture, TaskFailure};
use crate::errors::Result;
use crate::task::{TaskGraph, TaskKind, TaskRegistry};
use crate::types::{CompositionMode, SequencePolicy};

/// Process-scoped orchestration context.
///
/// Owns the validated task graph plus session-wide settings. It is created
/// once at startup and handed explicitly (usually as `Arc<Orchestrator>`) to
/// the CLI entry point and to watch sessions. There is no global state, so
/// several orchestrators can coexist, e.g. one per test.
#[derive(Debug)]
pub struct Orchestrator {
    graph: TaskGraph,
    policy: SequencePolicy,
    root: PathBuf,
}

impl Orchestrator {
    pub fn new(graph: TaskGraph, policy: SequencePolicy, root: impl Into<PathBuf>) -> Self {
        Self {
            graph,
            policy,
            root: root.into(),
        }
    }

    /// Validate `registry` and wrap it, using fail-fast sequences and the
    /// current directory as project root.
    pub fn from_registry(registry: TaskRegistry) -> Result<Self> {
        let graph = TaskGraph::build(registry)?;
        Ok(Self::new(graph, SequencePolicy::default(), "."))
    }

    pub fn with_policy(mut self, policy: SequencePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    pub fn policy(&self) -> SequencePolicy {
        self.policy
    }

    /// Project root that watch patterns and relative paths refer to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `name` and run it to completion.
    ///
    /// Unknown names are a structural error (`Err`); anything that goes
    /// wrong while the task runs is reported inside the returned signal.
    pub async fn run(&self, name: &str) -> Result<CompletionSignal> {
        self.graph.resolve(name)?;
        Ok(self.invoke(name).await)
    }

    /// Invoke a task known to the graph.
    ///
    /// The future is lazy: nothing happens (and no invocation is counted)
    /// until it is polled.
    pub fn invoke<'a>(&'a self, name: &'a str) -> SignalFuture<'a> {
        Box::pin(async move {
            let Some(def) = self.graph.get(name) else {
                warn!(task = %name, "invocation of unregistered task");
                return CompletionSignal::failure(TaskFailure::io(name, "task is not registered"));
            };

            let started = Instant::now();

            let signal = match def.kind() {
                TaskKind::Leaf(action) => {
                    info!(task = %name, "starting");
                    action.invoke(name).await
                }
                TaskKind::Composite { mode, children } => {
                    info!(task = %name, %mode, children = children.len(), "starting");
                    let steps: Vec<SignalFuture<'a>> =
                        children.iter().map(|child| self.invoke(child)).collect();
                    match mode {
                        CompositionMode::Sequence => sequence(steps, self.policy).await,
                        CompositionMode::Parallel => parallel(steps).await,
                    }
                }
            };

            let elapsed_ms = started.elapsed().as_millis() as u64;
            match &signal {
                CompletionSignal::Success => {
                    info!(task = %name, elapsed_ms, "finished");
                }
                CompletionSignal::Failure(reasons) => {
                    warn!(
                        task = %name,
                        elapsed_ms,
                        failures = reasons.len(),
                        "failed"
                    );
                }
            }

            signal
        })
    }

    /// Convenience for callers holding an `Arc`: a `'static` future that
    /// runs `name`.
    pub fn invoke_owned(self: &Arc<Self>, name: impl Into<String>) -> SignalFuture<'static> {
        let this = Arc::clone(self);
        let name = name.into();
        Box::pin(async move { this.invoke(&name).await })
    }
}
