//! **Schedule** — trigger; outputs {timestamp, next-run}. The cron string
//! is validated syntactically only; actual dispatch is external to the
//! core (spec §4.7).

use async_trait::async_trait;
use chrono::Utc;
use flowcore_core::Key;
use flowcore_error::NodeError;
use flowcore_node::{ExecutionContext, NodeCapabilities, NodeDefinition, NodeExecutor, NodeResult, ParameterDefinition, ParameterType};
use serde_json::{Map, Value};
use std::str::FromStr;

use crate::params;

pub struct ScheduleExecutor {
    definition: NodeDefinition,
}

impl ScheduleExecutor {
    pub fn new() -> Self {
        Self {
            definition: NodeDefinition::new(Key::from_str("schedule").unwrap(), "Schedule", "trigger")
                .with_capabilities(NodeCapabilities { is_trigger: true, supports_webhook: false })
                .with_parameters(vec![ParameterDefinition::new("cron", "Cron Expression", ParameterType::String).required()]),
        }
    }
}

impl Default for ScheduleExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// A cron expression is syntactically valid here if it has 5 fields
/// (minute hour day month weekday) or 6 (with a leading seconds field).
fn validate_cron(expression: &str) -> Result<(), NodeError> {
    let fields = expression.split_whitespace().count();
    if fields == 5 || fields == 6 {
        Ok(())
    } else {
        Err(NodeError::validation(format!(
            "cron expression must have 5 or 6 fields, got {fields}"
        )))
    }
}

#[async_trait]
impl NodeExecutor for ScheduleExecutor {
    fn definition(&self) -> &NodeDefinition {
        &self.definition
    }

    async fn execute(&self, parameters: Map<String, Value>, _context: &ExecutionContext) -> NodeResult {
        let cron = match params::str_param(&parameters, "cron") {
            Ok(cron) => cron,
            Err(err) => return NodeResult::error(err),
        };
        if let Err(err) = validate_cron(cron) {
            return NodeResult::error(err);
        }
        let now = Utc::now();
        NodeResult::success(serde_json::json!({
            "timestamp": now.to_rfc3339(),
            "next_run": Value::Null,
        }))
    }
}
