//! **Function** — logic; applies `map`/`filter`/`reduce`/`sort` over
//! `items` (or the node's input array) by evaluating `expression` per
//! item, binding `$json` to the current item (spec §4.7).

use std::collections::HashMap;

use async_trait::async_trait;
use flowcore_core::{EnvironmentProvider, Key, ProcessEnvironmentProvider};
use flowcore_error::NodeError;
use flowcore_expression::{EvaluationContext, ExpressionEngine, WorkflowContext};
use flowcore_node::{ExecutionContext, NodeDefinition, NodeExecutor, NodeResult, ParameterDefinition, ParameterType};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::str::FromStr;

use crate::params::{opt_str, str_param};

pub struct FunctionExecutor {
    definition: NodeDefinition,
    engine: ExpressionEngine,
}

impl FunctionExecutor {
    pub fn new() -> Self {
        Self {
            definition: NodeDefinition::new(Key::from_str("function").unwrap(), "Function", "logic").with_parameters(vec![
                ParameterDefinition::new("operation", "Operation", ParameterType::Select).required(),
                ParameterDefinition::new("expression", "Expression", ParameterType::Code).required(),
                ParameterDefinition::new("items", "Items", ParameterType::Array),
                ParameterDefinition::new("initialValue", "Initial Value", ParameterType::Number)
                    .visible_when("operation", Value::String("reduce".into())),
                ParameterDefinition::new("sortOrder", "Sort Order", ParameterType::Select)
                    .visible_when("operation", Value::String("sort".into())),
            ]),
            engine: ExpressionEngine::new(),
        }
    }
}

impl Default for FunctionExecutor {
    fn default() -> Self {
        Self::new()
    }
}

fn items_from(parameters: &Map<String, Value>, context: &ExecutionContext) -> Vec<Value> {
    let source = parameters.get("items").cloned().unwrap_or_else(|| context.input.clone());
    match source {
        Value::Array(items) => items,
        other => vec![other],
    }
}

fn eval_ctx_for<'a>(
    context: &'a ExecutionContext,
    fallback_env: &'a ProcessEnvironmentProvider,
    item: Value,
) -> EvaluationContext<'a> {
    let variables: HashMap<String, Value> = context.variables_snapshot().into_iter().collect();
    let workflow = WorkflowContext {
        id: context.workflow_id.to_string(),
        name: context.workflow_id.to_string(),
        variables,
    };
    let env: &dyn EnvironmentProvider = context.environment_provider().unwrap_or(fallback_env);
    EvaluationContext::new(workflow, env).with_json_item(item)
}

#[async_trait]
impl NodeExecutor for FunctionExecutor {
    fn definition(&self) -> &NodeDefinition {
        &self.definition
    }

    async fn execute(&self, parameters: Map<String, Value>, context: &ExecutionContext) -> NodeResult {
        let operation = match str_param(&parameters, "operation") {
            Ok(op) => op,
            Err(err) => return NodeResult::error(err),
        };
        let expression = match str_param(&parameters, "expression") {
            Ok(expr) => expr,
            Err(err) => return NodeResult::error(err),
        };
        let items = items_from(&parameters, context);
        let fallback_env = ProcessEnvironmentProvider;

        let result = match operation {
            "map" => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    if context.is_cancelled() {
                        return cancelled();
                    }
                    let ctx = eval_ctx_for(context, &fallback_env, item);
                    match self.engine.evaluate(expression, &ctx) {
                        Ok(value) => out.push(value),
                        Err(err) => return node_error(err.to_string()),
                    }
                }
                Value::Array(out)
            }
            "filter" => {
                let mut out = Vec::new();
                for item in items {
                    if context.is_cancelled() {
                        return cancelled();
                    }
                    let ctx = eval_ctx_for(context, &fallback_env, item.clone());
                    match self.engine.evaluate(expression, &ctx) {
                        Ok(value) => {
                            if crate::params::is_truthy(&value) {
                                out.push(item);
                            }
                        }
                        Err(err) => return node_error(err.to_string()),
                    }
                }
                Value::Array(out)
            }
            "reduce" => {
                let mut accumulator = parameters.get("initialValue").cloned().unwrap_or(Value::Null);
                for item in items {
                    if context.is_cancelled() {
                        return cancelled();
                    }
                    let mut ctx = eval_ctx_for(context, &fallback_env, item);
                    ctx = ctx.with_json_item(serde_json::json!({"item": ctx.json_item().clone(), "accumulator": accumulator}));
                    match self.engine.evaluate(expression, &ctx) {
                        Ok(value) => accumulator = value,
                        Err(err) => return node_error(err.to_string()),
                    }
                }
                accumulator
            }
            "sort" => {
                let mut keyed: Vec<(Value, Value)> = Vec::with_capacity(items.len());
                for item in items {
                    if context.is_cancelled() {
                        return cancelled();
                    }
                    let ctx = eval_ctx_for(context, &fallback_env, item.clone());
                    match self.engine.evaluate(expression, &ctx) {
                        Ok(key) => keyed.push((key, item)),
                        Err(err) => return node_error(err.to_string()),
                    }
                }
                let descending = opt_str(&parameters, "sortOrder").map(|o| o.eq_ignore_ascii_case("descending")).unwrap_or(false);
                keyed.sort_by(|a, b| compare_values(&a.0, &b.0));
                if descending {
                    keyed.reverse();
                }
                Value::Array(keyed.into_iter().map(|(_, item)| item).collect())
            }
            other => {
                return NodeResult::error(NodeError::validation(format!(
                    "unknown function operation {other:?}; expected map, filter, reduce, or sort"
                )))
            }
        };

        NodeResult::success(result)
    }
}

fn node_error(cause: String) -> NodeResult {
    NodeResult::error(NodeError::execution("function expression failed").with_cause(cause))
}

fn cancelled() -> NodeResult {
    NodeResult::error(NodeError::new(flowcore_error::NodeErrorKind::Cancelled, "cancelled during function evaluation"))
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .unwrap_or(0.0)
            .partial_cmp(&b.as_f64().unwrap_or(0.0))
            .unwrap_or(Ordering::Equal),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        _ => Ordering::Equal,
    }
}
