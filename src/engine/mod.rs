// src/engine/mod.rs

//! Orchestration engine.
//!
//! - [`signal`] defines the one-per-invocation [`CompletionSignal`].
//! - [`combinators`] implements `sequence` / `parallel` over signal futures.
//! - [`orchestrator`] walks a validated task graph, invoking leaves and
//!   composing children.

use std::future::Future;
use std::pin::Pin;

pub mod combinators;
pub mod orchestrator;
pub mod signal;

pub use combinators::{parallel, sequence};
pub use orchestrator::Orchestrator;
pub use signal::{CompletionSignal, FailureKind, TaskFailure};

/// A pending task invocation.
pub type SignalFuture<'a> = Pin<Box<dyn Future<Output = CompletionSignal> + Send + 'a>>;
