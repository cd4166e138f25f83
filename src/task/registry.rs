// src/task/registry.rs

//! Named task definitions, before validation.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::errors::{BuildflowError, Result};
use crate::exec::Action;
use crate::types::{CompositionMode, TaskName};

/// What a task does when invoked.
#[derive(Clone)]
pub enum TaskKind {
    /// Delegates to an external collaborator.
    Leaf(Arc<dyn Action>),
    /// Derives its completion from the named children, in this order.
    Composite {
        mode: CompositionMode,
        children: Vec<TaskName>,
    },
}

impl fmt::Debug for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Leaf(action) => f.debug_tuple("Leaf").field(&action.describe()).finish(),
            TaskKind::Composite { mode, children } => f
                .debug_struct("Composite")
                .field("mode", mode)
                .field("children", children)
                .finish(),
        }
    }
}

/// A registered task: name, behaviour, and the output roots it writes to.
#[derive(Debug, Clone)]
pub struct TaskDef {
    name: TaskName,
    kind: TaskKind,
    outputs: Vec<PathBuf>,
}

impl TaskDef {
    pub fn leaf(name: impl Into<TaskName>, action: Arc<dyn Action>) -> Self {
        Self {
            name: name.into(),
            kind: TaskKind::Leaf(action),
            outputs: Vec::new(),
        }
    }

    pub fn composite(
        name: impl Into<TaskName>,
        mode: CompositionMode,
        children: Vec<TaskName>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: TaskKind::Composite { mode, children },
            outputs: Vec::new(),
        }
    }

    /// Declare the output roots this task writes under.
    pub fn with_outputs<I, P>(mut self, outputs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.outputs = outputs.into_iter().map(Into::into).collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &TaskKind {
        &self.kind
    }

    /// Output roots declared on this task itself (not its children).
    pub fn outputs(&self) -> &[PathBuf] {
        &self.outputs
    }

    /// Children of a composite; empty for a leaf.
    pub fn children(&self) -> &[TaskName] {
        match &self.kind {
            TaskKind::Leaf(_) => &[],
            TaskKind::Composite { children, .. } => children,
        }
    }
}

/// Mutable collection of task definitions keyed by name.
///
/// Registration order is irrelevant and composites may name children that
/// are registered later. Structural checks that need the whole set (unknown
/// children, cycles, output conflicts) happen when the registry is turned
/// into a [`TaskGraph`](crate::task::TaskGraph).
#[derive(Debug, Default, Clone)]
pub struct TaskRegistry {
    tasks: BTreeMap<TaskName, TaskDef>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a leaf task.
    pub fn register(&mut self, name: impl Into<TaskName>, action: Arc<dyn Action>) -> Result<()> {
        self.register_def(TaskDef::leaf(name, action))
    }

    /// Register a sequence composite over `children`, in that order.
    pub fn sequence<I, S>(&mut self, name: impl Into<TaskName>, children: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        let children = children.into_iter().map(Into::into).collect();
        self.register_def(TaskDef::composite(name, CompositionMode::Sequence, children))
    }

    /// Register a parallel composite over `children`.
    pub fn parallel<I, S>(&mut self, name: impl Into<TaskName>, children: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        let children = children.into_iter().map(Into::into).collect();
        self.register_def(TaskDef::composite(name, CompositionMode::Parallel, children))
    }

    /// Register a fully built definition.
    ///
    /// Fails with [`BuildflowError::DuplicateName`] if the name is taken.
    pub fn register_def(&mut self, def: TaskDef) -> Result<()> {
        if self.tasks.contains_key(def.name()) {
            return Err(BuildflowError::DuplicateName(def.name().to_string()));
        }
        debug!(task = %def.name(), kind = ?def.kind(), "registered task");
        self.tasks.insert(def.name.clone(), def);
        Ok(())
    }

    /// Look up a task by name.
    pub fn resolve(&self, name: &str) -> Result<&TaskDef> {
        self.tasks
            .get(name)
            .ok_or_else(|| BuildflowError::UnknownTask(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(|s| s.as_str())
    }

    pub fn defs(&self) -> impl Iterator<Item = &TaskDef> {
        self.tasks.values()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::CompletionSignal;
    use crate::exec::fn_action;

    fn noop() -> Arc<dyn Action> {
        fn_action("noop", || async { CompletionSignal::Success })
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut reg = TaskRegistry::new();
        reg.register("lint", noop()).unwrap();

        let err = reg.register("lint", noop()).unwrap_err();
        assert!(matches!(err, BuildflowError::DuplicateName(name) if name == "lint"));

        let err = reg.sequence("lint", ["x"]).unwrap_err();
        assert!(matches!(err, BuildflowError::DuplicateName(_)));
    }

    #[test]
    fn resolve_unknown_fails() {
        let reg = TaskRegistry::new();
        let err = reg.resolve("styles").unwrap_err();
        assert!(matches!(err, BuildflowError::UnknownTask(name) if name == "styles"));
    }

    #[test]
    fn composite_keeps_child_order() {
        let mut reg = TaskRegistry::new();
        reg.sequence("build", ["clean", "assets", "report"]).unwrap();

        let def = reg.resolve("build").unwrap();
        assert_eq!(def.children(), ["clean", "assets", "report"]);
    }
}
