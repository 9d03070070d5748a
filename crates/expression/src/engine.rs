//! Entry point tying the validator, parser, and evaluator together.

use flowcore_core::Value;

use crate::context::EvaluationContext;
use crate::error::ExpressionResult;
use crate::parser::Parser;
use crate::template::Template;
use crate::{eval, validator};

/// Stateless facade over validate → parse → evaluate. Cheap to construct;
/// holds no per-call state, so the scheduler can share one instance across
/// an entire execution.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExpressionEngine;

impl ExpressionEngine {
    pub fn new() -> Self {
        Self
    }

    /// Validates and evaluates a single expression (the content between
    /// `{{` and `}}`, already unwrapped).
    pub fn evaluate(&self, source: &str, ctx: &EvaluationContext) -> ExpressionResult<Value> {
        tracing::trace!(expression = source, "evaluating expression");
        validator::validate(source)?;
        let expr = Parser::parse(source)?;
        eval::evaluate(&expr, ctx)
    }

    /// Validates an expression without evaluating it — used by parameter
    /// schema validation to reject malformed expressions up front.
    pub fn validate(&self, source: &str) -> ExpressionResult<()> {
        validator::validate(source)?;
        Parser::parse(source).map(|_| ())
    }

    /// Renders a full parameter string (spec §4.3's `{{ }}` splice-or-replace
    /// rule), parsing it as a [`Template`] first.
    pub fn render_template(&self, source: &str, ctx: &EvaluationContext) -> ExpressionResult<Value> {
        let template = Template::parse(source)?;
        template.render(self, ctx)
    }
}
