// src/task/mod.rs

//! Task definitions and their validated composition.
//!
//! - [`registry`] collects named leaf and composite definitions.
//! - [`graph`] validates a registry into an immutable [`TaskGraph`]
//!   (unknown children, cycles, output conflicts).
//! - [`outputs`] holds the output-root overlap rules.

pub mod graph;
pub mod outputs;
pub mod registry;

pub use graph::{TaskGraph, detect_cycle};
pub use registry::{TaskDef, TaskKind, TaskRegistry};
