//! **NoOp** — utility; passes context data through, optionally after a
//! delay. Used for tests (spec §4.7).

use std::time::Duration;

use async_trait::async_trait;
use flowcore_core::Key;
use flowcore_node::{with_cancellation, CancelOutcome, ExecutionContext, NodeDefinition, NodeExecutor, NodeResult, ParameterDefinition, ParameterType, ParameterValidation};
use serde_json::{Map, Value};
use std::str::FromStr;

pub struct NoOpExecutor {
    definition: NodeDefinition,
}

impl NoOpExecutor {
    pub fn new() -> Self {
        Self {
            definition: NodeDefinition::new(Key::from_str("noop").unwrap(), "No Op", "utility").with_parameters(vec![
                ParameterDefinition::new("delay", "Delay (ms)", ParameterType::Number)
                    .with_default(Value::from(0))
                    .with_validation(ParameterValidation { min: Some(0.0), max: Some(60_000.0), ..Default::default() }),
            ]),
        }
    }
}

impl Default for NoOpExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NodeExecutor for NoOpExecutor {
    fn definition(&self) -> &NodeDefinition {
        &self.definition
    }

    async fn execute(&self, parameters: Map<String, Value>, context: &ExecutionContext) -> NodeResult {
        let delay_ms = parameters.get("delay").and_then(Value::as_u64).unwrap_or(0).min(60_000);
        if delay_ms > 0 {
            let outcome = with_cancellation(&context.cancellation, None, tokio::time::sleep(Duration::from_millis(delay_ms))).await;
            if let Err(CancelOutcome::Cancelled | CancelOutcome::TimedOut) = outcome {
                return NodeResult::error(flowcore_error::NodeError::new(
                    flowcore_error::NodeErrorKind::Cancelled,
                    "cancelled during delay",
                ));
            }
        }
        NodeResult::success(context.input.clone())
    }
}
