// src/errors.rs

//! Crate-wide error type and aliases.
//!
//! Structural problems (bad config, unknown names, cycles, overlapping
//! outputs) are `BuildflowError`s and abort startup. Failures of the work a
//! task performs are never errors here; they travel as
//! [`CompletionSignal::Failure`](crate::engine::CompletionSignal) values.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildflowError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Duplicate task name: {0}")]
    DuplicateName(String),

    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("Cycle detected in task composition: {0}")]
    Cycle(String),

    #[error(
        "Output conflict in parallel task '{parent}': '{first}' and '{second}' both write under {path:?}"
    )]
    OutputConflict {
        parent: String,
        first: String,
        second: String,
        path: PathBuf,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, BuildflowError>;
