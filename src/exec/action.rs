// src/exec/action.rs

//! The `Action` trait: the leaf unit of work behind a task.
//!
//! The orchestrator never knows what a leaf does. It calls
//! [`Action::invoke`] and awaits the returned [`SignalFuture`]. Production
//! leaves are the shell command, clean, copy and clear-cache actions in this
//! module's siblings; tests plug in their own implementations.

use std::future::Future;
use std::sync::Arc;

use crate::engine::{CompletionSignal, SignalFuture};

/// A leaf unit of work.
pub trait Action: Send + Sync {
    /// Start one invocation.
    ///
    /// `task` is the name the action is registered under; implementations use
    /// it to attribute any [`TaskFailure`](crate::engine::TaskFailure).
    /// The returned future must resolve to exactly one signal and must not
    /// start any work before it is first polled.
    fn invoke<'a>(&'a self, task: &'a str) -> SignalFuture<'a>;

    /// Short human-readable description, used by `--dry-run`.
    fn describe(&self) -> String;
}

/// Adapter turning an async closure into an [`Action`].
pub struct FnAction<F> {
    f: F,
    description: String,
}

impl<F, Fut> FnAction<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = CompletionSignal> + Send + 'static,
{
    pub fn new(description: impl Into<String>, f: F) -> Self {
        Self {
            f,
            description: description.into(),
        }
    }
}

impl<F, Fut> Action for FnAction<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = CompletionSignal> + Send + 'static,
{
    fn invoke<'a>(&'a self, _task: &'a str) -> SignalFuture<'a> {
        Box::pin(async move { (self.f)().await })
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}

/// Convenience for registering closures: `fn_action("noop", || async { Success })`.
pub fn fn_action<F, Fut>(description: impl Into<String>, f: F) -> Arc<dyn Action>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CompletionSignal> + Send + 'static,
{
    Arc::new(FnAction::new(description, f))
}
