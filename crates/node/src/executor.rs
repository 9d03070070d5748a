//! The node executor contract (spec §4.2).

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::context::ExecutionContext;
use crate::definition::NodeDefinition;
use crate::result::NodeResult;

/// Implemented once per node kind and registered under its `kind_key` in a
/// [`crate::NodeRegistry`]. `execute` receives already-resolved parameters
/// (expression splicing happens before this call, at the engine layer) and
/// must honor cooperative cancellation via `context.cancellation`.
#[async_trait]
pub trait NodeExecutor: Send + Sync {
    fn definition(&self) -> &NodeDefinition;

    async fn execute(&self, parameters: Map<String, Value>, context: &ExecutionContext) -> NodeResult;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::NodeCapabilities;
    use flowcore_core::{ExecutionId, Key, NodeExecutionId, WorkflowId};
    use std::str::FromStr;

    struct EchoExecutor {
        definition: NodeDefinition,
    }

    #[async_trait]
    impl NodeExecutor for EchoExecutor {
        fn definition(&self) -> &NodeDefinition {
            &self.definition
        }

        async fn execute(&self, parameters: Map<String, Value>, _context: &ExecutionContext) -> NodeResult {
            NodeResult::success(Value::Object(parameters))
        }
    }

    #[tokio::test]
    async fn executor_echoes_parameters() {
        let executor = EchoExecutor {
            definition: NodeDefinition::new(Key::from_str("echo").unwrap(), "Echo", "test")
                .with_capabilities(NodeCapabilities::default()),
        };
        let ctx = ExecutionContext::new(
            ExecutionId::v4(),
            NodeExecutionId::v4(),
            WorkflowId::v4(),
            Key::from_str("n1").unwrap(),
        );
        let mut params = Map::new();
        params.insert("x".into(), Value::from(1));
        let result = executor.execute(params.clone(), &ctx).await;
        match result {
            NodeResult::Success { data, branch } => {
                assert_eq!(data, Value::Object(params));
                assert_eq!(branch, None);
            }
            NodeResult::Error { .. } => panic!("expected success"),
        }
    }
}
