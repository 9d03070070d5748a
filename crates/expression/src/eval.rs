//! AST evaluator with the per-evaluation bounds from spec §4.3: wall-clock
//! 5s, recursion depth 100, statement count 10,000, memory cap 4MB (the
//! last is an approximation — see [`Budget::charge`]).

use std::time::{Duration, Instant};

use flowcore_core::Value;

use crate::ast::{BinaryOp, Expr, RootKind, UnaryOp};
use crate::context::EvaluationContext;
use crate::error::{ExpressionError, ExpressionResult};
use crate::functions;

const MAX_WALL_CLOCK: Duration = Duration::from_secs(5);
const MAX_RECURSION: usize = 100;
const MAX_STATEMENTS: usize = 10_000;
const MAX_MEMORY_BYTES: usize = 4 * 1024 * 1024;

struct Budget {
    deadline: Instant,
    statements: usize,
    memory: usize,
}

impl Budget {
    fn new() -> Self {
        Self {
            deadline: Instant::now() + MAX_WALL_CLOCK,
            statements: 0,
            memory: 0,
        }
    }

    fn tick(&mut self) -> ExpressionResult<()> {
        self.statements += 1;
        if self.statements > MAX_STATEMENTS {
            return Err(ExpressionError::StatementCountExceeded(MAX_STATEMENTS));
        }
        if Instant::now() >= self.deadline {
            return Err(ExpressionError::WallClockExceeded(MAX_WALL_CLOCK));
        }
        Ok(())
    }

    /// Approximates the 4MB memory cap by summing the serialized size of
    /// every intermediate value produced during evaluation. Not a true
    /// allocator budget, but catches the runaway-string/array case the
    /// bound exists for.
    fn charge(&mut self, value: &Value) -> ExpressionResult<()> {
        self.memory += approx_size(value);
        if self.memory > MAX_MEMORY_BYTES {
            return Err(ExpressionError::MemoryExceeded(MAX_MEMORY_BYTES));
        }
        Ok(())
    }
}

fn approx_size(value: &Value) -> usize {
    match value {
        Value::Null | Value::Bool(_) => 1,
        Value::Number(_) => 8,
        Value::String(s) => s.len(),
        Value::Array(items) => items.iter().map(approx_size).sum(),
        Value::Object(map) => map.iter().map(|(k, v)| k.len() + approx_size(v)).sum(),
    }
}

pub fn evaluate(expr: &Expr, ctx: &EvaluationContext) -> ExpressionResult<Value> {
    let mut budget = Budget::new();
    eval_node(expr, ctx, &mut budget, 0)
}

fn eval_node(
    expr: &Expr,
    ctx: &EvaluationContext,
    budget: &mut Budget,
    depth: usize,
) -> ExpressionResult<Value> {
    if depth > MAX_RECURSION {
        return Err(ExpressionError::RecursionExceeded(MAX_RECURSION));
    }
    budget.tick()?;

    let value = match expr {
        Expr::Null => Value::Null,
        Expr::Bool(b) => Value::Bool(*b),
        Expr::Number(n) => Value::from(*n),
        Expr::Str(s) => Value::String(s.clone()),
        Expr::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(eval_node(item, ctx, budget, depth + 1)?);
            }
            Value::Array(out)
        }
        Expr::Root(kind) => eval_root(*kind, ctx)?,
        Expr::Member(base, name) => match base.as_ref() {
            Expr::Root(RootKind::Node) => resolve_node_member(name, ctx)?,
            Expr::Root(RootKind::Workflow) => resolve_workflow_member(name, ctx)?,
            Expr::Root(RootKind::Env) => resolve_env_member(name, ctx)?,
            _ => {
                let base_val = eval_node(base, ctx, budget, depth + 1)?;
                index_member(&base_val, name)?
            }
        },
        Expr::Index(base, idx) => {
            let base_val = eval_node(base, ctx, budget, depth + 1)?;
            let idx_val = eval_node(idx, ctx, budget, depth + 1)?;
            index_value(&base_val, &idx_val)?
        }
        Expr::Unary(op, inner) => {
            let v = eval_node(inner, ctx, budget, depth + 1)?;
            eval_unary(*op, &v)?
        }
        Expr::Binary(op, lhs, rhs) => {
            // short-circuit && / || without evaluating the unneeded side
            match op {
                BinaryOp::And => {
                    let l = eval_node(lhs, ctx, budget, depth + 1)?;
                    if !functions_as_bool(&l) {
                        Value::Bool(false)
                    } else {
                        let r = eval_node(rhs, ctx, budget, depth + 1)?;
                        Value::Bool(functions_as_bool(&r))
                    }
                }
                BinaryOp::Or => {
                    let l = eval_node(lhs, ctx, budget, depth + 1)?;
                    if functions_as_bool(&l) {
                        Value::Bool(true)
                    } else {
                        let r = eval_node(rhs, ctx, budget, depth + 1)?;
                        Value::Bool(functions_as_bool(&r))
                    }
                }
                _ => {
                    let l = eval_node(lhs, ctx, budget, depth + 1)?;
                    let r = eval_node(rhs, ctx, budget, depth + 1)?;
                    eval_binary(*op, &l, &r)?
                }
            }
        }
        Expr::Ternary(cond, then_branch, else_branch) => {
            let c = eval_node(cond, ctx, budget, depth + 1)?;
            if functions_as_bool(&c) {
                eval_node(then_branch, ctx, budget, depth + 1)?
            } else {
                eval_node(else_branch, ctx, budget, depth + 1)?
            }
        }
        Expr::Call(name, args) => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(eval_node(arg, ctx, budget, depth + 1)?);
            }
            functions::call(name, &values)?
        }
    };

    budget.charge(&value)?;
    Ok(value)
}

fn eval_root(kind: RootKind, ctx: &EvaluationContext) -> ExpressionResult<Value> {
    match kind {
        RootKind::Json => Ok(ctx.json_item().clone()),
        // $node/$workflow/$env only resolve through a Member access
        // (`$node.Start`, `$workflow.id`, `$env.NAME`), handled by the
        // root-specific branches in eval_node's Member arm.
        RootKind::Node => Err(ExpressionError::UndefinedAccessor(
            "$node must be followed by a node name, e.g. $node.Start".into(),
        )),
        RootKind::Workflow => Err(ExpressionError::UndefinedAccessor(
            "$workflow must be followed by a field, e.g. $workflow.id".into(),
        )),
        RootKind::Env => Err(ExpressionError::UndefinedAccessor(
            "$env must be followed by a variable name, e.g. $env.API_KEY".into(),
        )),
    }
}

/// `$node.<name>` — the node's last output, wrapped as `{"data": ...}`
/// (spec §4.3; see [`EvaluationContext::record_node_output`]).
fn resolve_node_member(name: &str, ctx: &EvaluationContext) -> ExpressionResult<Value> {
    ctx.node(name)
        .cloned()
        .ok_or_else(|| ExpressionError::UndefinedAccessor(format!("$node.{name}")))
}

/// `$workflow.id` / `$workflow.name` / `$workflow.variables.<name>`.
fn resolve_workflow_member(name: &str, ctx: &EvaluationContext) -> ExpressionResult<Value> {
    let wf = ctx.workflow();
    match name {
        "id" => Ok(Value::String(wf.id.clone())),
        "name" => Ok(Value::String(wf.name.clone())),
        "variables" => Ok(Value::Object(
            wf.variables
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )),
        other => Err(ExpressionError::UndefinedAccessor(format!("$workflow.{other}"))),
    }
}

/// `$env.<name>` — via the layered [`flowcore_core::EnvironmentProvider`].
/// A missing variable resolves to `null`, not an error: callers use
/// `defaultValue`/`isNull` to handle it, matching the "fallback" wording
/// in spec §4.3 rather than forcing every lookup through a presence check.
fn resolve_env_member(name: &str, ctx: &EvaluationContext) -> ExpressionResult<Value> {
    Ok(ctx
        .env_get(name)
        .map(Value::String)
        .unwrap_or(Value::Null))
}

fn index_member(base: &Value, name: &str) -> ExpressionResult<Value> {
    base.get(name)
        .cloned()
        .ok_or_else(|| ExpressionError::UndefinedAccessor(name.to_string()))
}

fn index_value(base: &Value, idx: &Value) -> ExpressionResult<Value> {
    match (base, idx) {
        (Value::Array(items), Value::Number(n)) => {
            let i = n.as_i64().unwrap_or(-1);
            if i < 0 || i as usize >= items.len() {
                return Err(ExpressionError::TypeError(format!("array index {i} out of bounds")));
            }
            Ok(items[i as usize].clone())
        }
        (Value::Object(_), Value::String(s)) => index_member(base, s),
        _ => Err(ExpressionError::TypeError(
            "index operator requires an array with a numeric index or an object with a string key".into(),
        )),
    }
}

fn eval_unary(op: UnaryOp, v: &Value) -> ExpressionResult<Value> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!functions_as_bool(v))),
        UnaryOp::Neg => match v {
            Value::Number(n) => Ok(Value::from(-n.as_f64().unwrap_or(0.0))),
            other => Err(ExpressionError::TypeError(format!("cannot negate {other}"))),
        },
    }
}

fn eval_binary(op: BinaryOp, l: &Value, r: &Value) -> ExpressionResult<Value> {
    use BinaryOp::*;
    match op {
        Add => match (l, r) {
            (Value::String(a), _) => Ok(Value::String(format!("{a}{}", display(r)))),
            (_, Value::String(b)) => Ok(Value::String(format!("{}{b}", display(l)))),
            _ => Ok(Value::from(as_f64(l)? + as_f64(r)?)),
        },
        Sub => Ok(Value::from(as_f64(l)? - as_f64(r)?)),
        Mul => Ok(Value::from(as_f64(l)? * as_f64(r)?)),
        Div => {
            let divisor = as_f64(r)?;
            if divisor == 0.0 {
                return Err(ExpressionError::DivisionByZero);
            }
            Ok(Value::from(as_f64(l)? / divisor))
        }
        Rem => {
            let divisor = as_f64(r)?;
            if divisor == 0.0 {
                return Err(ExpressionError::DivisionByZero);
            }
            Ok(Value::from(as_f64(l)? % divisor))
        }
        Eq => Ok(Value::Bool(l == r)),
        NotEq => Ok(Value::Bool(l != r)),
        Lt => Ok(Value::Bool(as_f64(l)? < as_f64(r)?)),
        LtEq => Ok(Value::Bool(as_f64(l)? <= as_f64(r)?)),
        Gt => Ok(Value::Bool(as_f64(l)? > as_f64(r)?)),
        GtEq => Ok(Value::Bool(as_f64(l)? >= as_f64(r)?)),
        And | Or => unreachable!("short-circuited in eval_node"),
    }
}

fn as_f64(v: &Value) -> ExpressionResult<f64> {
    v.as_f64()
        .or_else(|| v.as_str().and_then(|s| s.parse().ok()))
        .ok_or_else(|| ExpressionError::TypeError(format!("expected a number, got {v}")))
}

fn display(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn functions_as_bool(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::WorkflowContext;
    use flowcore_core::ProcessEnvironmentProvider;
    use std::collections::HashMap;

    fn ctx(env: &ProcessEnvironmentProvider) -> EvaluationContext<'_> {
        EvaluationContext::new(
            WorkflowContext {
                id: "wf1".into(),
                name: "Test Workflow".into(),
                variables: HashMap::from([("greeting".to_string(), Value::String("hi".into()))]),
            },
            env,
        )
    }

    #[test]
    fn arithmetic() {
        let env = ProcessEnvironmentProvider;
        let expr = crate::parser::Parser::parse("1 + 2 * 3").unwrap();
        assert_eq!(evaluate(&expr, &ctx(&env)).unwrap(), Value::from(7.0));
    }

    #[test]
    fn node_data_access() {
        let env = ProcessEnvironmentProvider;
        let mut c = ctx(&env);
        c.record_node_output("Start", serde_json::json!({"v": 42}));
        let expr = crate::parser::Parser::parse("$node.Start.data.v > 10").unwrap();
        assert_eq!(evaluate(&expr, &c).unwrap(), Value::Bool(true));
    }

    #[test]
    fn workflow_variable_access() {
        let env = ProcessEnvironmentProvider;
        let expr = crate::parser::Parser::parse("$workflow.variables.greeting").unwrap();
        assert_eq!(evaluate(&expr, &ctx(&env)).unwrap(), Value::String("hi".into()));
    }

    #[test]
    fn ternary_and_function_call() {
        let env = ProcessEnvironmentProvider;
        let expr = crate::parser::Parser::parse("toUpper('a') == 'A' ? 'yes' : 'no'").unwrap();
        assert_eq!(evaluate(&expr, &ctx(&env)).unwrap(), Value::String("yes".into()));
    }

    #[test]
    fn division_by_zero_errors() {
        let env = ProcessEnvironmentProvider;
        let expr = crate::parser::Parser::parse("1 / 0").unwrap();
        assert_eq!(evaluate(&expr, &ctx(&env)), Err(ExpressionError::DivisionByZero));
    }

    #[test]
    fn short_circuit_and_skips_right_side() {
        let env = ProcessEnvironmentProvider;
        let expr = crate::parser::Parser::parse("false && (1 / 0 > 0)").unwrap();
        assert_eq!(evaluate(&expr, &ctx(&env)).unwrap(), Value::Bool(false));
    }

    #[test]
    fn array_and_indexing() {
        let env = ProcessEnvironmentProvider;
        let expr = crate::parser::Parser::parse("[1, 2, 3][1]").unwrap();
        assert_eq!(evaluate(&expr, &ctx(&env)).unwrap(), Value::from(2.0));
    }
}
