//! **Split** — utility; breaks the node's input array into batches
//! (spec §4.7).

use async_trait::async_trait;
use flowcore_core::Key;
use flowcore_error::NodeError;
use flowcore_node::{ExecutionContext, NodeDefinition, NodeExecutor, NodeResult, ParameterDefinition, ParameterType, ParameterValidation};
use serde_json::{Map, Value};
use std::str::FromStr;

use crate::params::str_param;

pub struct SplitExecutor {
    definition: NodeDefinition,
}

impl SplitExecutor {
    pub fn new() -> Self {
        Self {
            definition: NodeDefinition::new(Key::from_str("split").unwrap(), "Split", "utility").with_parameters(vec![
                ParameterDefinition::new("mode", "Mode", ParameterType::Select).required(),
                ParameterDefinition::new("batchSize", "Batch Size", ParameterType::Number)
                    .with_validation(ParameterValidation { min: Some(1.0), ..Default::default() })
                    .visible_when("mode", Value::String("batchSize".into())),
                ParameterDefinition::new("property", "Property", ParameterType::String)
                    .visible_when("mode", Value::String("byProperty".into())),
            ]),
        }
    }
}

impl Default for SplitExecutor {
    fn default() -> Self {
        Self::new()
    }
}

fn items_of(context: &ExecutionContext) -> Vec<Value> {
    match &context.input {
        Value::Array(items) => items.clone(),
        Value::Null => Vec::new(),
        other => vec![other.clone()],
    }
}

#[async_trait]
impl NodeExecutor for SplitExecutor {
    fn definition(&self) -> &NodeDefinition {
        &self.definition
    }

    async fn execute(&self, parameters: Map<String, Value>, context: &ExecutionContext) -> NodeResult {
        let mode = match str_param(&parameters, "mode") {
            Ok(mode) => mode,
            Err(err) => return NodeResult::error(err),
        };
        let items = items_of(context);

        let batches: Vec<Value> = match mode {
            "itemPerOutput" => items.into_iter().map(|item| Value::Array(vec![item])).collect(),
            "batchSize" => {
                let size = parameters.get("batchSize").and_then(Value::as_u64).unwrap_or(0) as usize;
                if size == 0 {
                    return NodeResult::error(NodeError::validation("batchSize must be a positive integer"));
                }
                items.chunks(size).map(|chunk| Value::Array(chunk.to_vec())).collect()
            }
            "byProperty" => {
                let property = match parameters.get("property").and_then(Value::as_str) {
                    Some(property) => property,
                    None => return NodeResult::error(NodeError::validation("missing required parameter: property")),
                };
                let mut groups: Vec<(Value, Vec<Value>)> = Vec::new();
                for item in items {
                    let key = item.get(property).cloned().unwrap_or(Value::Null);
                    match groups.iter_mut().find(|(k, _)| *k == key) {
                        Some((_, bucket)) => bucket.push(item),
                        None => groups.push((key, vec![item])),
                    }
                }
                groups.into_iter().map(|(_, bucket)| Value::Array(bucket)).collect()
            }
            other => {
                return NodeResult::error(NodeError::validation(format!(
                    "unknown split mode {other:?}; expected itemPerOutput, batchSize, or byProperty"
                )))
            }
        };

        NodeResult::success(Value::Array(batches))
    }
}
