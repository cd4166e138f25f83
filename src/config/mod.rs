// src/config/mod.rs

//! `Buildflow.toml` handling.
//!
//! - [`model`]: serde types mirroring the TOML layout.
//! - [`validate`]: `RawConfigFile` → `ConfigFile` checks.
//! - [`loader`]: reading files, default locations.
//! - [`assemble`]: building the orchestrator, bindings and cache.

pub mod assemble;
pub mod loader;
pub mod model;
pub mod validate;

pub use assemble::{Project, assemble};
pub use loader::{config_root_dir, default_config_path, load_and_validate, load_from_path};
pub use model::{ConfigFile, RawConfigFile};
