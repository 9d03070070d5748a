//! **Merge** — utility; combines the data from every inbound edge once
//! all of them have reached a terminal state (spec §4.7). The scheduler
//! collects live-edge outputs into `context.input` as an array before
//! invoking this node; a pruned edge contributes `Value::Null`.

use async_trait::async_trait;
use flowcore_core::Key;
use flowcore_error::NodeError;
use flowcore_node::{ExecutionContext, NodeDefinition, NodeExecutor, NodeResult, ParameterDefinition, ParameterType};
use serde_json::{Map, Value};
use std::str::FromStr;

use crate::params::str_param;

pub struct MergeExecutor {
    definition: NodeDefinition,
}

impl MergeExecutor {
    pub fn new() -> Self {
        Self {
            definition: NodeDefinition::new(Key::from_str("merge").unwrap(), "Merge", "utility").with_parameters(vec![
                ParameterDefinition::new("mode", "Mode", ParameterType::Select).required(),
                ParameterDefinition::new("branchIndex", "Branch Index", ParameterType::Number)
                    .visible_when("mode", Value::String("chooseBranch".into())),
            ]),
        }
    }
}

impl Default for MergeExecutor {
    fn default() -> Self {
        Self::new()
    }
}

fn inputs(context: &ExecutionContext) -> Vec<Value> {
    match &context.input {
        Value::Array(items) => items.clone(),
        Value::Null => Vec::new(),
        other => vec![other.clone()],
    }
}

#[async_trait]
impl NodeExecutor for MergeExecutor {
    fn definition(&self) -> &NodeDefinition {
        &self.definition
    }

    async fn execute(&self, parameters: Map<String, Value>, context: &ExecutionContext) -> NodeResult {
        let mode = match str_param(&parameters, "mode") {
            Ok(mode) => mode,
            Err(err) => return NodeResult::error(err),
        };
        let inputs = inputs(context);

        let merged = match mode {
            "append" => Value::Array(
                inputs
                    .into_iter()
                    .flat_map(|v| match v {
                        Value::Array(items) => items,
                        Value::Null => Vec::new(),
                        other => vec![other],
                    })
                    .collect(),
            ),
            "merge" => {
                let mut combined = Map::new();
                for input in inputs {
                    if let Value::Object(map) = input {
                        combined.extend(map);
                    }
                }
                Value::Object(combined)
            }
            "keepKeyMatches" => {
                let objects: Vec<Map<String, Value>> = inputs
                    .into_iter()
                    .filter_map(|v| if let Value::Object(map) = v { Some(map) } else { None })
                    .collect();
                let mut result = Map::new();
                if let Some(first) = objects.first() {
                    for (key, value) in first {
                        if objects.iter().all(|obj| obj.get(key) == Some(value)) {
                            result.insert(key.clone(), value.clone());
                        }
                    }
                }
                Value::Object(result)
            }
            "chooseBranch" => {
                let index = parameters.get("branchIndex").and_then(Value::as_u64).unwrap_or(0) as usize;
                match inputs.get(index) {
                    Some(value) => value.clone(),
                    None => {
                        return NodeResult::error(NodeError::validation(format!(
                            "branchIndex {index} out of range for {len} inbound edges",
                            len = inputs.len()
                        )))
                    }
                }
            }
            other => {
                return NodeResult::error(NodeError::validation(format!(
                    "unknown merge mode {other:?}; expected append, merge, keepKeyMatches, or chooseBranch"
                )))
            }
        };

        NodeResult::success(merged)
    }
}
