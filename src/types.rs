use serde::Deserialize;

/// Canonical task name type used throughout the crate.
pub type TaskName = String;

/// How a composite task drives its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositionMode {
    /// One child at a time, in declaration order.
    Sequence,
    /// All children started together, joined on completion.
    Parallel,
}

impl std::fmt::Display for CompositionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompositionMode::Sequence => f.write_str("sequence"),
            CompositionMode::Parallel => f.write_str("parallel"),
        }
    }
}

/// What a `sequence` does when one of its children fails.
///
/// - `FailFast` (default): stop immediately, skip the remaining children and
///   propagate the failure unchanged.
/// - `Continue`: keep going through the remaining children and report every
///   failure as one aggregate at the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequencePolicy {
    FailFast,
    Continue,
}

impl Default for SequencePolicy {
    fn default() -> Self {
        SequencePolicy::FailFast
    }
}
