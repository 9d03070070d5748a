//! **If** — logic; routes by the boolean coercion of its resolved
//! `condition` parameter (spec §4.7).

use async_trait::async_trait;
use flowcore_core::Key;
use flowcore_node::{ExecutionContext, NodeDefinition, NodeExecutor, NodeResult, ParameterDefinition, ParameterType};
use serde_json::{Map, Value};
use std::str::FromStr;

use crate::params::{is_truthy, required};

pub struct IfExecutor {
    definition: NodeDefinition,
}

impl IfExecutor {
    pub fn new() -> Self {
        Self {
            definition: NodeDefinition::new(Key::from_str("if").unwrap(), "If", "logic")
                .with_parameters(vec![ParameterDefinition::new("condition", "Condition", ParameterType::Boolean).required()]),
        }
    }
}

impl Default for IfExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NodeExecutor for IfExecutor {
    fn definition(&self) -> &NodeDefinition {
        &self.definition
    }

    async fn execute(&self, parameters: Map<String, Value>, context: &ExecutionContext) -> NodeResult {
        let condition = match required(&parameters, "condition") {
            Ok(value) => value,
            Err(err) => return NodeResult::error(err),
        };
        let branch = if is_truthy(condition) { "true" } else { "false" };
        NodeResult::success_on_branch(context.input.clone(), branch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowcore_core::{ExecutionId, NodeExecutionId, WorkflowId};

    fn test_context() -> ExecutionContext {
        ExecutionContext::new(ExecutionId::v4(), NodeExecutionId::v4(), WorkflowId::v4(), Key::from_str("if").unwrap())
    }

    #[tokio::test]
    async fn truthy_condition_routes_true() {
        let executor = IfExecutor::new();
        let mut parameters = Map::new();
        parameters.insert("condition".into(), Value::Bool(true));
        let result = executor.execute(parameters, &test_context()).await;
        assert_eq!(result.branch(), Some("true"));
    }

    #[tokio::test]
    async fn falsy_condition_routes_false() {
        let executor = IfExecutor::new();
        let mut parameters = Map::new();
        parameters.insert("condition".into(), Value::Number(0.into()));
        let result = executor.execute(parameters, &test_context()).await;
        assert_eq!(result.branch(), Some("false"));
    }

    #[tokio::test]
    async fn missing_condition_is_validation_error() {
        let executor = IfExecutor::new();
        let result = executor.execute(Map::new(), &test_context()).await;
        match result {
            NodeResult::Error { error } => assert_eq!(error.kind, flowcore_error::NodeErrorKind::Validation),
            NodeResult::Success { .. } => panic!("expected error"),
        }
    }
}
