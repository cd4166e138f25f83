// src/engine/combinators.rs

//! `sequence` and `parallel` composition of signal futures.
//!
//! Both combinators take the children as an explicit, ordered `Vec`. Each
//! element is a *lazy* future: nothing runs until it is polled, so a child
//! that a fail-fast sequence never reaches is never invoked.

use futures::future::join_all;
use tracing::debug;

use crate::engine::{CompletionSignal, SignalFuture};
use crate::types::SequencePolicy;

/// Run `steps` one at a time, in order.
///
/// With [`SequencePolicy::FailFast`] the first failure is returned unchanged
/// and the remaining steps are dropped unpolled. With
/// [`SequencePolicy::Continue`] every step runs and all failures are
/// aggregated in step order.
pub async fn sequence(steps: Vec<SignalFuture<'_>>, policy: SequencePolicy) -> CompletionSignal {
    let total = steps.len();
    let mut collected = Vec::with_capacity(total);

    for (index, step) in steps.into_iter().enumerate() {
        let signal = step.await;

        if signal.is_failure() && policy == SequencePolicy::FailFast {
            debug!(
                failed_at = index,
                skipped = total - index - 1,
                "sequence aborted on first failure"
            );
            return signal;
        }

        collected.push(signal);
    }

    CompletionSignal::aggregate(collected)
}

/// Start every step concurrently and wait for all of them.
///
/// Siblings are never cancelled when one fails. The aggregate keeps the
/// declaration order of `steps`, not the order in which they finished.
pub async fn parallel(steps: Vec<SignalFuture<'_>>) -> CompletionSignal {
    let signals = join_all(steps).await;
    CompletionSignal::aggregate(signals)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::engine::TaskFailure;

    fn step(
        counter: Arc<AtomicUsize>,
        delay_ms: u64,
        result: CompletionSignal,
    ) -> SignalFuture<'static> {
        Box::pin(async move {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            result
        })
    }

    #[tokio::test]
    async fn fail_fast_never_polls_later_steps() {
        let counter = Arc::new(AtomicUsize::new(0));
        let steps = vec![
            step(counter.clone(), 0, CompletionSignal::Success),
            step(
                counter.clone(),
                0,
                CompletionSignal::failure(TaskFailure::transform("b", "boom")),
            ),
            step(counter.clone(), 0, CompletionSignal::Success),
        ];

        let signal = sequence(steps, SequencePolicy::FailFast).await;

        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(signal.reasons()[0].task, "b");
    }

    #[tokio::test]
    async fn continue_policy_runs_everything() {
        let counter = Arc::new(AtomicUsize::new(0));
        let steps = vec![
            step(
                counter.clone(),
                0,
                CompletionSignal::failure(TaskFailure::io("a", "x")),
            ),
            step(
                counter.clone(),
                0,
                CompletionSignal::failure(TaskFailure::io("b", "y")),
            ),
        ];

        let signal = sequence(steps, SequencePolicy::Continue).await;

        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(signal.reasons().len(), 2);
    }

    #[tokio::test]
    async fn parallel_reports_in_declaration_order() {
        let counter = Arc::new(AtomicUsize::new(0));
        // The slow failure is declared first but finishes last.
        let steps = vec![
            step(
                counter.clone(),
                30,
                CompletionSignal::failure(TaskFailure::transform("slow", "late")),
            ),
            step(
                counter.clone(),
                0,
                CompletionSignal::failure(TaskFailure::transform("fast", "early")),
            ),
        ];

        let signal = parallel(steps).await;

        let names: Vec<&str> = signal.reasons().iter().map(|r| r.task.as_str()).collect();
        assert_eq!(names, vec!["slow", "fast"]);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn empty_composites_succeed() {
        assert!(sequence(Vec::new(), SequencePolicy::FailFast).await.is_success());
        assert!(parallel(Vec::new()).await.is_success());
    }
}
