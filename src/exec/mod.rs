// src/exec/mod.rs

//! Leaf actions.
//!
//! - [`action`] defines the [`Action`] trait the orchestrator invokes.
//! - [`command`] runs external tools through the platform shell.
//! - [`clean`] and [`clear_cache`] are the two built-in utilities.
//! - [`copy`] copies a glob-selected file set (fonts and other static
//!   assets).
//! - [`cached`] wraps any action with the transformation cache.

pub mod action;
pub mod cached;
pub mod clean;
pub mod clear_cache;
pub mod command;
pub mod copy;

pub use action::{Action, FnAction, fn_action};
pub use cached::CachedAction;
pub use clean::{CleanAction, clean};
pub use clear_cache::{ClearCacheAction, clear_cache};
pub use command::CommandAction;
pub use copy::CopyAction;
