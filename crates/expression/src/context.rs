//! Evaluation context: the data available inside `{{ … }}` (spec §4.3).

use std::collections::HashMap;

use flowcore_core::{EnvironmentProvider, Value};

/// The `$workflow.*` accessor surface.
#[derive(Debug, Clone)]
pub struct WorkflowContext {
    pub id: String,
    pub name: String,
    pub variables: HashMap<String, Value>,
}

/// Everything a `{{ … }}` expression can read: prior node outputs, workflow
/// metadata/variables, environment variables, and the current item (for
/// nodes that iterate, e.g. Function).
pub struct EvaluationContext<'a> {
    /// Keyed by node display-name, per spec §4.3: "`$node` — keyed by
    /// node-name". Each value is wrapped as `{"data": <output>}` so that
    /// `$node.Name.data.field` resolves the way the boundary-case examples
    /// in spec §8 write it.
    node_outputs: HashMap<String, Value>,
    workflow: WorkflowContext,
    env: &'a dyn EnvironmentProvider,
    json_item: Value,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(workflow: WorkflowContext, env: &'a dyn EnvironmentProvider) -> Self {
        Self {
            node_outputs: HashMap::new(),
            workflow,
            env,
            json_item: Value::Null,
        }
    }

    pub fn with_json_item(mut self, item: Value) -> Self {
        self.json_item = item;
        self
    }

    /// Records `node_name`'s last output, ready for `$node.<node_name>`
    /// access. Called by the scheduler as each node completes.
    pub fn record_node_output(&mut self, node_name: impl Into<String>, data: Value) {
        self.node_outputs
            .insert(node_name.into(), serde_json::json!({ "data": data }));
    }

    pub fn node(&self, name: &str) -> Option<&Value> {
        self.node_outputs.get(name)
    }

    pub fn workflow(&self) -> &WorkflowContext {
        &self.workflow
    }

    pub fn env_get(&self, name: &str) -> Option<String> {
        self.env.get(name)
    }

    pub fn json_item(&self) -> &Value {
        &self.json_item
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowcore_core::ProcessEnvironmentProvider;

    #[test]
    fn records_and_reads_node_output() {
        let provider = ProcessEnvironmentProvider;
        let mut ctx = EvaluationContext::new(
            WorkflowContext {
                id: "wf1".into(),
                name: "Test".into(),
                variables: HashMap::new(),
            },
            &provider,
        );
        ctx.record_node_output("Start", serde_json::json!({"v": 42}));
        let stored = ctx.node("Start").unwrap();
        assert_eq!(stored["data"]["v"], 42);
    }
}
