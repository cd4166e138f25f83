#![allow(dead_code)]

use std::sync::Arc;

use buildflow::engine::Orchestrator;
use buildflow::exec::Action;
use buildflow::task::TaskRegistry;
use buildflow::types::SequencePolicy;

pub use buildflow_test_utils::builders::{ConfigFileBuilder, TaskConfigBuilder};
pub use buildflow_test_utils::fakes::{CountingAction, GatedAction, InvocationLog};
pub use buildflow_test_utils::{init_tracing, with_timeout};

/// Register `action` under `name`, keeping the concrete handle for asserts.
pub fn leaf<A: Action + 'static>(reg: &mut TaskRegistry, name: &str, action: &Arc<A>) {
    let action: Arc<dyn Action> = action.clone();
    reg.register(name, action).unwrap();
}

pub fn orchestrator(reg: TaskRegistry, policy: SequencePolicy) -> Arc<Orchestrator> {
    Arc::new(Orchestrator::from_registry(reg).unwrap().with_policy(policy))
}
