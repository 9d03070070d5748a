//! **Start** — trigger; outputs the trigger payload verbatim (spec §4.7).

use async_trait::async_trait;
use flowcore_core::Key;
use flowcore_node::{ExecutionContext, NodeCapabilities, NodeDefinition, NodeExecutor, NodeResult};
use serde_json::{Map, Value};
use std::str::FromStr;

pub struct StartExecutor {
    definition: NodeDefinition,
}

impl StartExecutor {
    pub fn new() -> Self {
        Self {
            definition: NodeDefinition::new(Key::from_str("start").unwrap(), "Start", "trigger")
                .with_capabilities(NodeCapabilities { is_trigger: true, supports_webhook: false }),
        }
    }
}

impl Default for StartExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NodeExecutor for StartExecutor {
    fn definition(&self) -> &NodeDefinition {
        &self.definition
    }

    async fn execute(&self, _parameters: Map<String, Value>, context: &ExecutionContext) -> NodeResult {
        NodeResult::success(context.input.clone())
    }
}
