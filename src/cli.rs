// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::default_config_path;

/// Command-line arguments for `buildflow`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "buildflow",
    version,
    about = "Compose and run front-end build tasks, once or on file changes.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Its directory is the project root that task paths and watch patterns
    /// are relative to.
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path(), global = true)]
    pub config: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `BUILDFLOW_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the task tree, but don't execute anything.
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Same as `watch` (what runs without a subcommand).
    Default,
    /// Start the watch bindings and the dev server; runs until Ctrl-C.
    Watch,
    /// Run the `build` task.
    Build,
    /// Run the `clean` task.
    Clean,
    /// Run the `clear-cache` task.
    ClearCache,
    /// Run any task by name.
    Run {
        /// Task name as declared in `[task.<name>]`.
        task: String,
    },
}

impl Command {
    /// Task invoked by one-shot commands; `None` for watch mode.
    pub fn task_name(&self) -> Option<&str> {
        match self {
            Command::Default | Command::Watch => None,
            Command::Build => Some("build"),
            Command::Clean => Some("clean"),
            Command::ClearCache => Some("clear-cache"),
            Command::Run { task } => Some(task),
        }
    }
}

impl CliArgs {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Default)
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_default() {
        let args = CliArgs::try_parse_from(["buildflow"]).unwrap();
        assert_eq!(args.command(), Command::Default);
        assert_eq!(args.config, PathBuf::from("Buildflow.toml"));
        assert_eq!(args.command().task_name(), None);
    }

    #[test]
    fn subcommands_map_to_tasks() {
        let args = CliArgs::try_parse_from(["buildflow", "clear-cache"]).unwrap();
        assert_eq!(args.command().task_name(), Some("clear-cache"));

        let args =
            CliArgs::try_parse_from(["buildflow", "run", "styles", "--config", "web/Buildflow.toml"])
                .unwrap();
        assert_eq!(args.command().task_name(), Some("styles"));
        assert_eq!(args.config, PathBuf::from("web/Buildflow.toml"));
    }
}
