//! Parameter resolution: recursively renders `{{ }}` templates in a node's
//! raw parameter map against a freshly-built evaluation context (spec §4.3,
//! §4.4 step 5). Resolution happens just before the node runs, never
//! earlier, so every call here builds its own [`EvaluationContext`] from
//! the current state of completed nodes and workflow variables.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use flowcore_core::EnvironmentProvider;
use flowcore_expression::{EvaluationContext, ExpressionEngine, WorkflowContext};
use serde_json::{Map, Value};

use crate::error::ParameterResolutionError;

fn resolve_value(engine: &ExpressionEngine, value: &Value, ctx: &EvaluationContext) -> Result<Value, ParameterResolutionError> {
    match value {
        Value::String(source) => Ok(engine.render_template(source, ctx)?),
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(resolve_value(engine, item, ctx)?);
            }
            Ok(Value::Array(out))
        }
        Value::Object(map) => {
            let mut out = Map::new();
            for (key, item) in map {
                out.insert(key.clone(), resolve_value(engine, item, ctx)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

/// Renders every parameter value in `raw` against `ctx`, recursing into
/// arrays and objects so a templated string nested inside either is still
/// resolved.
pub fn resolve_parameters(engine: &ExpressionEngine, raw: &HashMap<String, Value>, ctx: &EvaluationContext) -> Result<Map<String, Value>, ParameterResolutionError> {
    let mut resolved = Map::new();
    for (key, value) in raw {
        resolved.insert(key.clone(), resolve_value(engine, value, ctx)?);
    }
    Ok(resolved)
}

/// Input to a single parameter-resolution call, owned so it can cross into
/// `spawn_blocking` (expression evaluation is synchronous CPU work; see
/// spec §4.3's wall-clock bound, which this wraps with an outer timeout).
pub struct ResolutionInputs {
    pub workflow_id: String,
    pub variables: Map<String, Value>,
    pub node_outputs: HashMap<String, Value>,
    pub json_item: Value,
    pub raw_parameters: HashMap<String, Value>,
}

/// Resolves `inputs.raw_parameters` off the async executor, bounded by
/// `timeout`. A timeout or task panic is reported distinctly from an
/// expression failure so the scheduler can classify it via
/// [`ParameterResolutionError::node_error_kind`].
pub async fn resolve_parameters_bounded(
    environment: Arc<dyn EnvironmentProvider>,
    inputs: ResolutionInputs,
    timeout: Duration,
) -> Result<Map<String, Value>, ParameterResolutionError> {
    let engine = ExpressionEngine::new();
    let join = tokio::task::spawn_blocking(move || {
        let workflow = WorkflowContext {
            id: inputs.workflow_id.clone(),
            name: inputs.workflow_id,
            variables: inputs.variables.into_iter().collect(),
        };
        let mut ctx = EvaluationContext::new(workflow, environment.as_ref()).with_json_item(inputs.json_item);
        for (display_name, data) in inputs.node_outputs {
            ctx.record_node_output(display_name, data);
        }
        resolve_parameters(&engine, &inputs.raw_parameters, &ctx)
    });

    match tokio::time::timeout(timeout, join).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(ParameterResolutionError::TaskFailed(join_err.to_string())),
        Err(_elapsed) => Err(ParameterResolutionError::TimedOut),
    }
}
