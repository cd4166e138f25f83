// src/lib.rs

pub mod cache;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod task;
pub mod types;
pub mod watch;

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::cli::{CliArgs, Command};
use crate::config::{ConfigFile, Project, assemble, config_root_dir, load_and_validate};
use crate::engine::{CompletionSignal, Orchestrator, parallel};
use crate::fs::RealFileSystem;
use crate::task::{TaskGraph, TaskKind};
use crate::watch::WatchSession;

/// High-level entry point used by `main.rs`. Returns the process exit code.
///
/// This wires together:
/// - config loading and validation
/// - task graph, orchestrator and transformation cache
/// - one-shot task runs, or the watch session plus dev server
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<i32> {
    let config_path = args.config.clone();
    let cfg = load_and_validate(&config_path)?;
    let root = config_root_dir(&config_path);
    let project = assemble(&cfg, &root, Arc::new(RealFileSystem))?;
    let command = args.command();

    if args.dry_run {
        if let Some(task) = command.task_name() {
            project.orchestrator.graph().resolve(task)?;
        }
        print_dry_run(&cfg, &project, &command);
        return Ok(0);
    }

    match command.task_name() {
        Some(task) => run_once(&project.orchestrator, task).await,
        None => run_watch(&cfg, project).await,
    }
}

/// Run one task to completion and report its signal.
pub async fn run_once(orchestrator: &Orchestrator, task: &str) -> Result<i32> {
    let signal = orchestrator.run(task).await?;
    report_signal(task, &signal);
    Ok(signal.exit_code())
}

fn report_signal(task: &str, signal: &CompletionSignal) {
    match signal {
        CompletionSignal::Success => println!("✓ {task}"),
        CompletionSignal::Failure(_) => eprintln!("✗ {task} {signal}"),
    }
}

/// Watch mode: bindings, startup tasks and the dev server, until Ctrl-C.
///
/// Failures anywhere are reported and never end the session.
async fn run_watch(cfg: &ConfigFile, project: Project) -> Result<i32> {
    let Project {
        orchestrator,
        bindings,
        ..
    } = project;

    if bindings.is_empty() && cfg.dev.serve.is_none() {
        warn!("no [[watch]] bindings and no [dev] serve task; waiting for Ctrl-C only");
    }

    let mut session = WatchSession::start(Arc::clone(&orchestrator), bindings);
    session.watch_filesystem()?;

    let startup = async {
        if cfg.dev.startup.is_empty() {
            return;
        }
        info!(tasks = ?cfg.dev.startup, "running startup tasks");
        let steps = cfg
            .dev
            .startup
            .iter()
            .map(|task| orchestrator.invoke(task))
            .collect();
        let signal = parallel(steps).await;
        report_signal("startup", &signal);
    };

    let serve = async {
        if let Some(task) = &cfg.dev.serve {
            info!(task = %task, "starting dev server");
            let signal = orchestrator.invoke(task).await;
            report_signal(task, &signal);
            warn!(task = %task, "dev server exited; still watching");
        }
    };

    let background = async {
        tokio::join!(startup, serve);
        std::future::pending::<()>().await
    };

    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                warn!(error = %e, "failed to listen for Ctrl-C");
            }
        }
        _ = background => {}
    }

    info!("shutting down; waiting for running tasks (Ctrl-C again to force)");
    tokio::select! {
        _ = session.stop() => {}
        _ = tokio::signal::ctrl_c() => warn!("forced shutdown"),
    }

    Ok(0)
}

/// Print the resolved task tree for `command` without running anything.
fn print_dry_run(cfg: &ConfigFile, project: &Project, command: &Command) {
    let graph = project.orchestrator.graph();

    println!("buildflow dry-run");
    println!("  config.sequence_policy = {:?}", cfg.config.sequence_policy);
    println!("  config.cache_dir = {}", project.cache.dir().display());
    if let Some(out) = &cfg.config.output_root {
        println!("  config.output_root = {}", out.display());
    }
    println!();

    match command.task_name() {
        Some(task) => print_tree(graph, task, 0),
        None => {
            println!("watch bindings ({}):", project.bindings.len());
            for binding in &project.bindings {
                println!(
                    "  - {:?} -> {}",
                    binding.patterns().patterns(),
                    binding.task()
                );
            }
            if let Some(serve) = &cfg.dev.serve {
                println!("dev server:");
                print_tree(graph, serve, 1);
            }
            if !cfg.dev.startup.is_empty() {
                println!("startup (parallel):");
                for task in &cfg.dev.startup {
                    print_tree(graph, task, 1);
                }
            }
        }
    }

    debug!("dry-run complete (no execution)");
}

fn print_tree(graph: &TaskGraph, name: &str, depth: usize) {
    let indent = "  ".repeat(depth);
    let Some(def) = graph.get(name) else {
        println!("{indent}- {name} (unknown task)");
        return;
    };

    match def.kind() {
        TaskKind::Leaf(action) => println!("{indent}- {name}: {}", action.describe()),
        TaskKind::Composite { mode, children } => {
            println!("{indent}- {name} ({mode})");
            for child in children {
                print_tree(graph, child, depth + 1);
            }
        }
    }
}
