// src/watch/mod.rs

//! File watching.
//!
//! This module is responsible for:
//! - Compiling include/exclude glob patterns per watch binding.
//! - The per-binding trigger state machine (one pending re-run at most).
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//!
//! It does not know how tasks compose; it hands task names to the
//! [`Orchestrator`](crate::engine::Orchestrator) and reports the signals.

pub mod path_utils;
pub mod patterns;
pub mod session;
pub mod trigger;
pub mod watcher;

pub use patterns::{PatternSet, WatchBinding, build_globset, collect_matching_files};
pub use session::{BindingOutcome, PathRouter, WatchSession};
pub use trigger::{CompletionDecision, EventDecision, TriggerPhase, TriggerState};
pub use watcher::{WatcherHandle, spawn_watcher};
