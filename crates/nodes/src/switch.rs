//! **Switch** — logic; first-match, case-insensitive string equality over
//! `value` against each case, falling back to `fallbackOutput` when
//! nothing matches (spec §4.7).

use async_trait::async_trait;
use flowcore_core::Key;
use flowcore_error::NodeError;
use flowcore_node::{ExecutionContext, NodeDefinition, NodeExecutor, NodeResult, ParameterDefinition, ParameterType};
use serde_json::{Map, Value};
use std::str::FromStr;

use crate::params::{array_param, required};

pub struct SwitchExecutor {
    definition: NodeDefinition,
}

impl SwitchExecutor {
    pub fn new() -> Self {
        Self {
            definition: NodeDefinition::new(Key::from_str("switch").unwrap(), "Switch", "logic").with_parameters(vec![
                ParameterDefinition::new("value", "Value", ParameterType::String).required(),
                ParameterDefinition::new("cases", "Cases", ParameterType::Collection).required(),
                ParameterDefinition::new("fallbackOutput", "Fallback Output", ParameterType::Number),
            ]),
        }
    }
}

impl Default for SwitchExecutor {
    fn default() -> Self {
        Self::new()
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl NodeExecutor for SwitchExecutor {
    fn definition(&self) -> &NodeDefinition {
        &self.definition
    }

    async fn execute(&self, parameters: Map<String, Value>, context: &ExecutionContext) -> NodeResult {
        let value = match required(&parameters, "value") {
            Ok(v) => display(v).to_lowercase(),
            Err(err) => return NodeResult::error(err),
        };
        let cases = match array_param(&parameters, "cases") {
            Ok(c) => c,
            Err(err) => return NodeResult::error(err),
        };

        for case in cases {
            let Some(case_value) = case.get("value") else { continue };
            let Some(output_index) = case.get("outputIndex").and_then(Value::as_i64) else { continue };
            if display(case_value).to_lowercase() == value {
                return NodeResult::success_on_branch(context.input.clone(), output_index.to_string());
            }
        }

        let fallback = parameters.get("fallbackOutput").and_then(Value::as_i64).unwrap_or(-1);
        if fallback >= 0 {
            NodeResult::success_on_branch(context.input.clone(), fallback.to_string())
        } else {
            NodeResult::error(NodeError::execution(format!("no case matched value {value:?} and no fallback configured")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowcore_core::{ExecutionId, NodeExecutionId, WorkflowId};
    use serde_json::json;

    fn test_context() -> ExecutionContext {
        ExecutionContext::new(ExecutionId::v4(), NodeExecutionId::v4(), WorkflowId::v4(), Key::from_str("switch").unwrap())
    }

    fn parameters_with(value: &str, cases: Value, fallback: Option<i64>) -> Map<String, Value> {
        let mut parameters = Map::new();
        parameters.insert("value".into(), Value::String(value.into()));
        parameters.insert("cases".into(), cases);
        if let Some(fallback) = fallback {
            parameters.insert("fallbackOutput".into(), Value::from(fallback));
        }
        parameters
    }

    #[tokio::test]
    async fn matches_case_insensitively() {
        let executor = SwitchExecutor::new();
        let parameters = parameters_with(
            "RED",
            json!([{"value": "red", "outputIndex": 0}, {"value": "blue", "outputIndex": 1}]),
            None,
        );
        let result = executor.execute(parameters, &test_context()).await;
        assert_eq!(result.branch(), Some("0"));
    }

    #[tokio::test]
    async fn falls_back_when_configured() {
        let executor = SwitchExecutor::new();
        let parameters = parameters_with("green", json!([{"value": "red", "outputIndex": 0}]), Some(2));
        let result = executor.execute(parameters, &test_context()).await;
        assert_eq!(result.branch(), Some("2"));
    }

    #[tokio::test]
    async fn errors_when_no_match_and_no_fallback() {
        let executor = SwitchExecutor::new();
        let parameters = parameters_with("green", json!([{"value": "red", "outputIndex": 0}]), None);
        let result = executor.execute(parameters, &test_context()).await;
        assert!(!result.is_success());
    }

    #[tokio::test]
    async fn first_match_wins_over_later_duplicates() {
        let executor = SwitchExecutor::new();
        let parameters = parameters_with(
            "red",
            json!([{"value": "red", "outputIndex": 0}, {"value": "red", "outputIndex": 1}]),
            None,
        );
        let result = executor.execute(parameters, &test_context()).await;
        assert_eq!(result.branch(), Some("0"));
    }
}
