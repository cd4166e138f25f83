//! Scriptable leaf actions for orchestration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{Semaphore, watch};

use buildflow::engine::{CompletionSignal, FailureKind, SignalFuture, TaskFailure};
use buildflow::exec::Action;

/// Shared, ordered record of invocations across several fake actions.
#[derive(Debug, Clone, Default)]
pub struct InvocationLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl InvocationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.entries.lock().unwrap().iter().filter(|e| *e == entry).count()
    }
}

/// Leaf that counts its invocations and resolves to a fixed outcome,
/// optionally after a delay.
#[derive(Debug)]
pub struct CountingAction {
    calls: AtomicUsize,
    failure: Option<(FailureKind, String)>,
    delay: Option<Duration>,
    log: Option<InvocationLog>,
}

impl CountingAction {
    pub fn succeeding() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failure: None,
            delay: None,
            log: None,
        }
    }

    /// Fails with a `Transform` reason carrying `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some((FailureKind::Transform, message.to_string())),
            ..Self::succeeding()
        }
    }

    pub fn failing_io(message: &str) -> Self {
        Self {
            failure: Some((FailureKind::Io, message.to_string())),
            ..Self::succeeding()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Record `start:<task>` and `end:<task>` in `log`.
    pub fn with_log(mut self, log: &InvocationLog) -> Self {
        self.log = Some(log.clone());
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Action for CountingAction {
    fn invoke<'a>(&'a self, task: &'a str) -> SignalFuture<'a> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(log) = &self.log {
                log.push(format!("start:{task}"));
            }
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(log) = &self.log {
                log.push(format!("end:{task}"));
            }

            match &self.failure {
                None => CompletionSignal::Success,
                Some((FailureKind::Io, msg)) => CompletionSignal::failure(TaskFailure::io(task, msg)),
                Some((FailureKind::Transform, msg)) => {
                    CompletionSignal::failure(TaskFailure::transform(task, msg))
                }
            }
        })
    }

    fn describe(&self) -> String {
        "counting fake".to_string()
    }
}

/// Leaf whose invocations block until the test releases them one by one.
///
/// Lets a test hold a task "in flight" while it fires more watch events.
#[derive(Debug)]
pub struct GatedAction {
    gate: Semaphore,
    started: watch::Sender<usize>,
    finished: watch::Sender<usize>,
}

impl Default for GatedAction {
    fn default() -> Self {
        Self::new()
    }
}

impl GatedAction {
    pub fn new() -> Self {
        Self {
            gate: Semaphore::new(0),
            started: watch::Sender::new(0),
            finished: watch::Sender::new(0),
        }
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Let one pending (or future) invocation complete.
    pub fn release(&self) {
        self.gate.add_permits(1);
    }

    pub fn started(&self) -> usize {
        *self.started.borrow()
    }

    pub fn finished(&self) -> usize {
        *self.finished.borrow()
    }

    pub async fn wait_started(&self, n: usize) {
        let mut rx = self.started.subscribe();
        rx.wait_for(|v| *v >= n).await.expect("gate dropped");
    }

    pub async fn wait_finished(&self, n: usize) {
        let mut rx = self.finished.subscribe();
        rx.wait_for(|v| *v >= n).await.expect("gate dropped");
    }
}

impl Action for GatedAction {
    fn invoke<'a>(&'a self, _task: &'a str) -> SignalFuture<'a> {
        Box::pin(async move {
            self.started.send_modify(|n| *n += 1);
            self.gate
                .acquire()
                .await
                .expect("gate semaphore closed")
                .forget();
            self.finished.send_modify(|n| *n += 1);
            CompletionSignal::Success
        })
    }

    fn describe(&self) -> String {
        "gated fake".to_string()
    }
}
