// src/task/graph.rs

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::errors::{BuildflowError, Result};
use crate::task::outputs::first_overlap;
use crate::task::registry::{TaskDef, TaskKind, TaskRegistry};
use crate::types::{CompositionMode, TaskName};

/// Validated, immutable composition tree.
///
/// Building a `TaskGraph` is the "composition time" check: every child name
/// resolves, the parent→child relation is acyclic, and no two children of a
/// parallel composite write under the same output root. Nothing can be
/// invoked before this succeeds.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    tasks: BTreeMap<TaskName, TaskDef>,
    /// Own outputs plus those of all descendants.
    effective_outputs: BTreeMap<TaskName, Vec<PathBuf>>,
}

impl TaskGraph {
    pub fn build(registry: TaskRegistry) -> Result<Self> {
        let tasks: BTreeMap<TaskName, TaskDef> = registry
            .defs()
            .map(|def| (def.name().to_string(), def.clone()))
            .collect();

        ensure_children_exist(&tasks)?;
        let order = composition_order(&tasks)?;
        let effective_outputs = effective_outputs(&tasks, &order);
        check_parallel_outputs(&tasks, &effective_outputs)?;

        debug!(tasks = tasks.len(), "task graph validated");

        Ok(Self {
            tasks,
            effective_outputs,
        })
    }

    pub fn get(&self, name: &str) -> Option<&TaskDef> {
        self.tasks.get(name)
    }

    pub fn resolve(&self, name: &str) -> Result<&TaskDef> {
        self.get(name)
            .ok_or_else(|| BuildflowError::UnknownTask(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Output roots written by `name` or any of its descendants.
    pub fn effective_outputs(&self, name: &str) -> &[PathBuf] {
        self.effective_outputs
            .get(name)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Tasks that no composite refers to (the natural CLI entry points).
    pub fn top_level(&self) -> Vec<&str> {
        let referenced: HashSet<&str> = self
            .tasks
            .values()
            .flat_map(|def| def.children().iter().map(|c| c.as_str()))
            .collect();

        self.names()
            .filter(|name| !referenced.contains(name))
            .collect()
    }
}

/// Fail with a cycle error if the given parent→child edges contain a cycle
/// (self-references included).
///
/// Shared by [`TaskGraph::build`] and config validation.
pub fn detect_cycle<'a, N, E>(nodes: N, edges: E) -> Result<Vec<&'a str>>
where
    N: IntoIterator<Item = &'a str>,
    E: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for node in nodes {
        graph.add_node(node);
    }
    for (parent, child) in edges {
        graph.add_edge(parent, child, ());
    }

    // A topological sort fails exactly when there is a cycle.
    toposort(&graph, None).map_err(|cycle| {
        BuildflowError::Cycle(format!(
            "cycle detected in task composition involving task '{}'",
            cycle.node_id()
        ))
    })
}

fn ensure_children_exist(tasks: &BTreeMap<TaskName, TaskDef>) -> Result<()> {
    for def in tasks.values() {
        for child in def.children() {
            if !tasks.contains_key(child) {
                return Err(BuildflowError::UnknownTask(format!(
                    "{child} (child of '{}')",
                    def.name()
                )));
            }
        }
    }
    Ok(())
}

/// Parent-before-child order over all tasks.
fn composition_order(tasks: &BTreeMap<TaskName, TaskDef>) -> Result<Vec<TaskName>> {
    let edges = tasks.values().flat_map(|def| {
        def.children()
            .iter()
            .map(move |child| (def.name(), child.as_str()))
    });

    let order = detect_cycle(tasks.keys().map(|k| k.as_str()), edges)?;
    Ok(order.into_iter().map(str::to_string).collect())
}

fn effective_outputs(
    tasks: &BTreeMap<TaskName, TaskDef>,
    order: &[TaskName],
) -> BTreeMap<TaskName, Vec<PathBuf>> {
    let mut effective: BTreeMap<TaskName, Vec<PathBuf>> = BTreeMap::new();

    // Children come after their parents in `order`, so walk it backwards.
    for name in order.iter().rev() {
        let Some(def) = tasks.get(name) else {
            continue;
        };

        let mut outputs: Vec<PathBuf> = def.outputs().to_vec();
        for child in def.children() {
            if let Some(child_outputs) = effective.get(child) {
                for out in child_outputs {
                    if !outputs.contains(out) {
                        outputs.push(out.clone());
                    }
                }
            }
        }
        effective.insert(name.clone(), outputs);
    }

    effective
}

fn check_parallel_outputs(
    tasks: &BTreeMap<TaskName, TaskDef>,
    effective: &BTreeMap<TaskName, Vec<PathBuf>>,
) -> Result<()> {
    let empty: Vec<PathBuf> = Vec::new();

    for def in tasks.values() {
        let TaskKind::Composite {
            mode: CompositionMode::Parallel,
            children,
        } = def.kind()
        else {
            continue;
        };

        for (i, first) in children.iter().enumerate() {
            for second in children.iter().skip(i + 1) {
                let left = effective.get(first).unwrap_or(&empty);
                let right = effective.get(second).unwrap_or(&empty);

                if let Some(path) = first_overlap(left, right) {
                    return Err(BuildflowError::OutputConflict {
                        parent: def.name().to_string(),
                        first: first.clone(),
                        second: second.clone(),
                        path,
                    });
                }
            }
        }
    }

    Ok(())
}
