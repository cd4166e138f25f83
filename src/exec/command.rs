// src/exec/command.rs

//! Shell command leaf action.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;

use anyhow::{Context, Result};
use regex::Regex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::engine::{CompletionSignal, SignalFuture, TaskFailure};
use crate::exec::action::Action;

/// Upper bound on failure-reason lines kept per stream.
const MAX_REASON_LINES: usize = 20;

/// Runs `cmd` through the platform shell.
///
/// Exit status 0 is `Success`. A non-zero exit is a `Transform` failure whose
/// message carries the lines matching `error_pattern` (from either stream),
/// or the last non-empty stderr line when there is no pattern or no match.
/// Failing to start or wait for the process is an `Io` failure.
#[derive(Debug, Clone)]
pub struct CommandAction {
    cmd: String,
    cwd: Option<PathBuf>,
    env: BTreeMap<String, String>,
    error_pattern: Option<Regex>,
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

#[derive(Debug, Default)]
struct StreamTail {
    matched: Vec<String>,
    last: Option<String>,
}

impl CommandAction {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            cwd: None,
            env: BTreeMap::new(),
            error_pattern: None,
        }
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_error_pattern(mut self, pattern: Regex) -> Self {
        self.error_pattern = Some(pattern);
        self
    }

    pub fn cmd(&self) -> &str {
        &self.cmd
    }

    fn shell(&self) -> Command {
        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&self.cmd);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&self.cmd);
            c
        };

        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }
        cmd.envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    async fn run(&self, task: &str) -> CompletionSignal {
        info!(task = %task, cmd = %self.cmd, "starting process");

        match self.run_inner(task).await {
            Ok(signal) => signal,
            Err(err) => CompletionSignal::failure(TaskFailure::io(task, format!("{err:#}"))),
        }
    }

    async fn run_inner(&self, task: &str) -> Result<CompletionSignal> {
        let mut child = self
            .shell()
            .spawn()
            .with_context(|| format!("spawning `{}`", self.cmd))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let (out_tail, err_tail, status) = tokio::join!(
            self.drain(task, stdout, Stream::Stdout),
            self.drain(task, stderr, Stream::Stderr),
            child.wait(),
        );
        let status = status.with_context(|| format!("waiting for `{}`", self.cmd))?;

        info!(
            task = %task,
            exit_code = status.code().unwrap_or(-1),
            success = status.success(),
            "process exited"
        );

        if status.success() {
            return Ok(CompletionSignal::Success);
        }

        let head = match status.code() {
            Some(code) => format!("exited with code {code}"),
            None => "terminated by signal".to_string(),
        };
        let message = failure_message(head, &err_tail, &out_tail);
        Ok(CompletionSignal::failure(TaskFailure::transform(task, message)))
    }

    /// Forward one output stream to the log, remembering what a failure
    /// message may need.
    async fn drain<R>(&self, task: &str, reader: Option<R>, stream: Stream) -> StreamTail
    where
        R: AsyncRead + Unpin,
    {
        let mut tail = StreamTail::default();
        let Some(reader) = reader else {
            return tail;
        };

        // Raw lines, so non-UTF-8 output never stops the drain early.
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!(task = %task, error = %e, "reading process output failed");
                    break;
                }
            }
            let line = String::from_utf8_lossy(&buf);
            let line = line.trim_end_matches(['\n', '\r']);

            match stream {
                Stream::Stdout => info!(task = %task, "{}", line),
                Stream::Stderr => debug!(task = %task, "stderr: {}", line),
            }

            if let Some(pattern) = &self.error_pattern {
                if pattern.is_match(line) && tail.matched.len() < MAX_REASON_LINES {
                    tail.matched.push(line.trim_end().to_string());
                }
            }
            if !line.trim().is_empty() {
                tail.last = Some(line.trim_end().to_string());
            }
        }
        tail
    }
}

fn failure_message(head: String, stderr: &StreamTail, stdout: &StreamTail) -> String {
    let matched: Vec<&str> = stderr
        .matched
        .iter()
        .chain(stdout.matched.iter())
        .map(String::as_str)
        .collect();

    if !matched.is_empty() {
        format!("{head}\n{}", matched.join("\n"))
    } else if let Some(last) = &stderr.last {
        format!("{head}: {last}")
    } else {
        head
    }
}

impl Action for CommandAction {
    fn invoke<'a>(&'a self, task: &'a str) -> SignalFuture<'a> {
        Box::pin(self.run(task))
    }

    fn describe(&self) -> String {
        match &self.cwd {
            Some(cwd) => format!("$ {} (in {})", self.cmd, cwd.display()),
            None => format!("$ {}", self.cmd),
        }
    }
}
