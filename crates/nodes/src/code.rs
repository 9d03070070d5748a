//! **Code** — logic; evaluates its `code` parameter through the same
//! expression evaluator used for parameter resolution, so a script can
//! never escape that sandbox (spec §4.7).

use std::collections::HashMap;

use async_trait::async_trait;
use flowcore_core::{EnvironmentProvider, Key, ProcessEnvironmentProvider};
use flowcore_error::NodeError;
use flowcore_expression::{EvaluationContext, ExpressionEngine, WorkflowContext};
use flowcore_node::{ExecutionContext, NodeDefinition, NodeExecutor, NodeResult, ParameterDefinition, ParameterType};
use serde_json::{Map, Value};
use std::str::FromStr;

use crate::params::str_param;

pub struct CodeExecutor {
    definition: NodeDefinition,
    engine: ExpressionEngine,
}

impl CodeExecutor {
    pub fn new() -> Self {
        Self {
            definition: NodeDefinition::new(Key::from_str("code").unwrap(), "Code", "logic")
                .with_parameters(vec![ParameterDefinition::new("code", "Code", ParameterType::Code).required()]),
            engine: ExpressionEngine::new(),
        }
    }
}

impl Default for CodeExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NodeExecutor for CodeExecutor {
    fn definition(&self) -> &NodeDefinition {
        &self.definition
    }

    async fn execute(&self, parameters: Map<String, Value>, context: &ExecutionContext) -> NodeResult {
        let code = match str_param(&parameters, "code") {
            Ok(code) => code,
            Err(err) => return NodeResult::error(err),
        };

        let variables: HashMap<String, Value> = context.variables_snapshot().into_iter().collect();
        let workflow = WorkflowContext {
            id: context.workflow_id.to_string(),
            name: context.workflow_id.to_string(),
            variables,
        };

        let fallback_env = ProcessEnvironmentProvider;
        let env: &dyn EnvironmentProvider = context.environment_provider().unwrap_or(&fallback_env);
        let eval_ctx = EvaluationContext::new(workflow, env).with_json_item(context.input.clone());

        if context.is_cancelled() {
            return NodeResult::error(NodeError::new(flowcore_error::NodeErrorKind::Cancelled, "cancelled before code evaluation"));
        }

        match self.engine.evaluate(code, &eval_ctx) {
            Ok(value) => NodeResult::success(value),
            Err(err) => NodeResult::error(NodeError::execution("code evaluation failed").with_cause(err.to_string())),
        }
    }
}
