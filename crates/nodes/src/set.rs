//! **Set** — utility; merges or replaces the node's input data with
//! resolved `{name, value}` pairs (spec §4.7).

use async_trait::async_trait;
use flowcore_core::Key;
use flowcore_node::{ExecutionContext, NodeDefinition, NodeExecutor, NodeResult, ParameterDefinition, ParameterType};
use serde_json::{Map, Value};
use std::str::FromStr;

use crate::params::{array_param, bool_param};

pub struct SetExecutor {
    definition: NodeDefinition,
}

impl SetExecutor {
    pub fn new() -> Self {
        Self {
            definition: NodeDefinition::new(Key::from_str("set").unwrap(), "Set", "utility").with_parameters(vec![
                ParameterDefinition::new("values", "Values", ParameterType::Collection).required(),
                ParameterDefinition::new("keepOnlySet", "Keep Only Set", ParameterType::Boolean).with_default(Value::Bool(false)),
            ]),
        }
    }
}

impl Default for SetExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NodeExecutor for SetExecutor {
    fn definition(&self) -> &NodeDefinition {
        &self.definition
    }

    async fn execute(&self, parameters: Map<String, Value>, context: &ExecutionContext) -> NodeResult {
        let values = match array_param(&parameters, "values") {
            Ok(v) => v,
            Err(err) => return NodeResult::error(err),
        };
        let keep_only_set = bool_param(&parameters, "keepOnlySet", false);

        let mut base = if keep_only_set {
            Map::new()
        } else {
            match context.input.as_object() {
                Some(map) => map.clone(),
                None => Map::new(),
            }
        };

        for pair in values {
            let Some(name) = pair.get("name").and_then(Value::as_str) else { continue };
            let value = pair.get("value").cloned().unwrap_or(Value::Null);
            base.insert(name.to_string(), value);
        }

        NodeResult::success(Value::Object(base))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowcore_core::{ExecutionId, NodeExecutionId, WorkflowId};
    use serde_json::json;

    fn test_context(input: Value) -> ExecutionContext {
        ExecutionContext::new(ExecutionId::v4(), NodeExecutionId::v4(), WorkflowId::v4(), Key::from_str("set").unwrap())
            .with_input(input)
    }

    #[tokio::test]
    async fn merges_into_existing_input_by_default() {
        let executor = SetExecutor::new();
        let mut parameters = Map::new();
        parameters.insert("values".into(), json!([{"name": "b", "value": 2}]));
        let ctx = test_context(json!({"a": 1}));
        let result = executor.execute(parameters, &ctx).await;
        match result {
            NodeResult::Success { data, .. } => assert_eq!(data, json!({"a": 1, "b": 2})),
            NodeResult::Error { .. } => panic!("expected success"),
        }
    }

    #[tokio::test]
    async fn keep_only_set_drops_prior_input() {
        let executor = SetExecutor::new();
        let mut parameters = Map::new();
        parameters.insert("values".into(), json!([{"name": "b", "value": 2}]));
        parameters.insert("keepOnlySet".into(), Value::Bool(true));
        let ctx = test_context(json!({"a": 1}));
        let result = executor.execute(parameters, &ctx).await;
        match result {
            NodeResult::Success { data, .. } => assert_eq!(data, json!({"b": 2})),
            NodeResult::Error { .. } => panic!("expected success"),
        }
    }

    #[tokio::test]
    async fn missing_values_is_validation_error() {
        let executor = SetExecutor::new();
        let result = executor.execute(Map::new(), &test_context(Value::Null)).await;
        assert!(!result.is_success());
    }
}
