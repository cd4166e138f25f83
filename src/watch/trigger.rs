// src/watch/trigger.rs

//! Pure per-binding trigger state machine.
//!
//! `Idle → Triggered → Idle`. While a binding's task is running, any number
//! of further matching events collapse into a single pending re-run. No
//! Tokio, channels or IO here; the async worker in [`session`] drives it.
//!
//! [`session`]: crate::watch::session

/// Phase of one watch binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerPhase {
    Idle,
    Triggered,
}

/// What the worker should do after a matching event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDecision {
    /// Nothing was running: start the bound task now.
    Start,
    /// A run is in progress: one re-run is now pending.
    QueueRerun,
    /// A re-run was already pending; this event is absorbed.
    Coalesced,
}

/// What the worker should do once the running invocation finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionDecision {
    /// Start the pending re-run immediately.
    Rerun,
    /// Back to idle.
    Idle,
}

#[derive(Debug, Clone)]
pub struct TriggerState {
    phase: TriggerPhase,
    rerun_pending: bool,
    /// Events absorbed into an already pending re-run (diagnostics).
    coalesced: u64,
}

impl Default for TriggerState {
    fn default() -> Self {
        Self::new()
    }
}

impl TriggerState {
    pub fn new() -> Self {
        Self {
            phase: TriggerPhase::Idle,
            rerun_pending: false,
            coalesced: 0,
        }
    }

    pub fn phase(&self) -> TriggerPhase {
        self.phase
    }

    pub fn rerun_pending(&self) -> bool {
        self.rerun_pending
    }

    pub fn coalesced(&self) -> u64 {
        self.coalesced
    }

    /// A matching filesystem event arrived.
    pub fn on_event(&mut self) -> EventDecision {
        match (self.phase, self.rerun_pending) {
            (TriggerPhase::Idle, _) => {
                self.phase = TriggerPhase::Triggered;
                EventDecision::Start
            }
            (TriggerPhase::Triggered, false) => {
                self.rerun_pending = true;
                EventDecision::QueueRerun
            }
            (TriggerPhase::Triggered, true) => {
                self.coalesced += 1;
                EventDecision::Coalesced
            }
        }
    }

    /// The in-flight invocation produced its signal.
    pub fn on_complete(&mut self) -> CompletionDecision {
        debug_assert_eq!(self.phase, TriggerPhase::Triggered);

        if self.rerun_pending {
            self.rerun_pending = false;
            // Stay Triggered: the re-run starts right away.
            CompletionDecision::Rerun
        } else {
            self.phase = TriggerPhase::Idle;
            CompletionDecision::Idle
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_event_runs_once() {
        let mut s = TriggerState::new();
        assert_eq!(s.on_event(), EventDecision::Start);
        assert_eq!(s.phase(), TriggerPhase::Triggered);
        assert_eq!(s.on_complete(), CompletionDecision::Idle);
        assert_eq!(s.phase(), TriggerPhase::Idle);
    }

    #[test]
    fn burst_during_run_collapses_into_one_rerun() {
        let mut s = TriggerState::new();
        let mut starts = 0;

        if s.on_event() == EventDecision::Start {
            starts += 1;
        }
        for _ in 0..5 {
            assert_ne!(s.on_event(), EventDecision::Start);
        }
        assert!(s.rerun_pending());
        assert_eq!(s.coalesced(), 4);

        if s.on_complete() == CompletionDecision::Rerun {
            starts += 1;
        }
        assert_eq!(s.on_complete(), CompletionDecision::Idle);

        assert_eq!(starts, 2);
    }

    #[test]
    fn event_during_rerun_queues_again() {
        let mut s = TriggerState::new();
        s.on_event();
        s.on_event();
        assert_eq!(s.on_complete(), CompletionDecision::Rerun);
        // A change during the re-run earns another re-run.
        assert_eq!(s.on_event(), EventDecision::QueueRerun);
        assert_eq!(s.on_complete(), CompletionDecision::Rerun);
        assert_eq!(s.on_complete(), CompletionDecision::Idle);
    }
}
