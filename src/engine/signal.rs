// src/engine/signal.rs

//! Completion signals.
//!
//! Every invocation of a task resolves to exactly one [`CompletionSignal`].
//! Leaf actions produce them directly; composites derive theirs from their
//! children with [`CompletionSignal::aggregate`].

use std::fmt;

use crate::types::TaskName;

/// Category of a runtime failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Filesystem or process-spawn problem.
    Io,
    /// The external collaborator rejected its input (syntax error, lint
    /// violation, non-zero exit).
    Transform,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Io => f.write_str("io"),
            FailureKind::Transform => f.write_str("transform"),
        }
    }
}

/// One failure reason, attributed to the leaf task that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    pub task: TaskName,
    pub kind: FailureKind,
    pub message: String,
}

impl TaskFailure {
    pub fn io(task: impl Into<TaskName>, message: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            kind: FailureKind::Io,
            message: message.into(),
        }
    }

    pub fn transform(task: impl Into<TaskName>, message: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            kind: FailureKind::Transform,
            message: message.into(),
        }
    }
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.task, self.kind, self.message)
    }
}

/// Terminal outcome of one task invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionSignal {
    Success,
    /// Never empty. Reasons are ordered by child declaration order.
    Failure(Vec<TaskFailure>),
}

impl CompletionSignal {
    pub fn failure(reason: TaskFailure) -> Self {
        CompletionSignal::Failure(vec![reason])
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CompletionSignal::Success)
    }

    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }

    /// Reasons carried by this signal (empty on success).
    pub fn reasons(&self) -> &[TaskFailure] {
        match self {
            CompletionSignal::Success => &[],
            CompletionSignal::Failure(reasons) => reasons,
        }
    }

    /// Fold child signals, in declaration order, into one signal.
    ///
    /// `Success` only if every child succeeded; otherwise a `Failure` holding
    /// all child reasons in the order the children were given.
    pub fn aggregate<I>(signals: I) -> Self
    where
        I: IntoIterator<Item = CompletionSignal>,
    {
        let reasons: Vec<TaskFailure> = signals
            .into_iter()
            .flat_map(|s| match s {
                CompletionSignal::Success => Vec::new(),
                CompletionSignal::Failure(r) => r,
            })
            .collect();

        if reasons.is_empty() {
            CompletionSignal::Success
        } else {
            CompletionSignal::Failure(reasons)
        }
    }

    /// Process exit code for a top-level signal.
    pub fn exit_code(&self) -> i32 {
        match self {
            CompletionSignal::Success => 0,
            CompletionSignal::Failure(_) => 1,
        }
    }
}

impl fmt::Display for CompletionSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionSignal::Success => f.write_str("success"),
            CompletionSignal::Failure(reasons) => {
                write!(f, "failed ({} reason", reasons.len())?;
                if reasons.len() != 1 {
                    f.write_str("s")?;
                }
                f.write_str(")")?;
                for r in reasons {
                    write!(f, "\n  ✗ {r}")?;
                }
                Ok(())
            }
        }
    }
}
