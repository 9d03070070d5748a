//! **Webhook** — trigger; outputs {headers, query, body, method} taken
//! from the trigger payload (spec §4.7).

use async_trait::async_trait;
use flowcore_core::Key;
use flowcore_node::{ExecutionContext, NodeCapabilities, NodeDefinition, NodeExecutor, NodeResult};
use serde_json::{Map, Value};
use std::str::FromStr;

pub struct WebhookExecutor {
    definition: NodeDefinition,
}

impl WebhookExecutor {
    pub fn new() -> Self {
        Self {
            definition: NodeDefinition::new(Key::from_str("webhook").unwrap(), "Webhook", "trigger")
                .with_capabilities(NodeCapabilities { is_trigger: true, supports_webhook: true }),
        }
    }
}

impl Default for WebhookExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NodeExecutor for WebhookExecutor {
    fn definition(&self) -> &NodeDefinition {
        &self.definition
    }

    async fn execute(&self, _parameters: Map<String, Value>, context: &ExecutionContext) -> NodeResult {
        let payload = &context.input;
        let output = serde_json::json!({
            "headers": payload.get("headers").cloned().unwrap_or(Value::Object(Map::new())),
            "query": payload.get("query").cloned().unwrap_or(Value::Object(Map::new())),
            "body": payload.get("body").cloned().unwrap_or(Value::Null),
            "method": payload.get("method").cloned().unwrap_or(Value::Null),
        });
        NodeResult::success(output)
    }
}
