//! `{{ … }}` splicing (spec §4.3): "If a string is a single `{{ … }}`
//! spanning the entire value, its typed evaluation result replaces the
//! string; otherwise each substitution is evaluated, coerced to text, and
//! spliced." Position-tracked parts, grounded on the reference workspace's
//! `Template`/`TemplatePart` design, minus its whitespace-control syntax
//! (not part of this grammar).

use flowcore_core::Value;

use crate::context::EvaluationContext;
use crate::engine::ExpressionEngine;
use crate::error::{ExpressionError, ExpressionResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Static(String),
    Expression { source: String, position: Position },
}

#[derive(Debug, Clone)]
pub struct Template {
    source: String,
    parts: Vec<TemplatePart>,
}

impl Template {
    pub fn parse(source: &str) -> ExpressionResult<Self> {
        let parts = split(source)?;
        Ok(Self {
            source: source.to_string(),
            parts,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn parts(&self) -> &[TemplatePart] {
        &self.parts
    }

    /// True when the whole template is a single `{{ … }}` spanning the
    /// entire value — the typed-replacement case from spec §4.3.
    #[must_use]
    pub fn is_single_expression(&self) -> bool {
        matches!(self.parts.as_slice(), [TemplatePart::Expression { .. }])
    }

    /// Evaluates the template: a single spanning expression yields its
    /// typed [`Value`] directly; otherwise every expression part is
    /// evaluated, coerced to text, and spliced between the static parts.
    pub fn render(&self, engine: &ExpressionEngine, ctx: &EvaluationContext) -> ExpressionResult<Value> {
        if let [TemplatePart::Expression { source, .. }] = self.parts.as_slice() {
            return engine.evaluate(source, ctx);
        }

        let mut out = String::with_capacity(self.source.len());
        for part in &self.parts {
            match part {
                TemplatePart::Static(text) => out.push_str(text),
                TemplatePart::Expression { source, .. } => {
                    let value = engine.evaluate(source, ctx)?;
                    out.push_str(&coerce_to_text(&value));
                }
            }
        }
        Ok(Value::String(out))
    }
}

fn coerce_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn split(source: &str) -> ExpressionResult<Vec<TemplatePart>> {
    let chars: Vec<char> = source.chars().collect();
    let len = chars.len();
    let mut parts = Vec::new();
    let mut i = 0;
    let mut static_buf = String::new();

    while i < len {
        if i + 1 < len && chars[i] == '{' && chars[i + 1] == '{' {
            if !static_buf.is_empty() {
                parts.push(TemplatePart::Static(std::mem::take(&mut static_buf)));
            }
            let start = i;
            let mut j = i + 2;
            let mut depth = 1;
            while j + 1 <= len {
                if j + 1 < len && chars[j] == '{' && chars[j + 1] == '{' {
                    depth += 1;
                    j += 2;
                } else if j + 1 < len && chars[j] == '}' && chars[j + 1] == '}' {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    j += 2;
                } else {
                    j += 1;
                }
            }
            if depth != 0 || j + 1 >= len {
                return Err(ExpressionError::UnclosedExpression(start));
            }
            let expr_source: String = chars[i + 2..j].iter().collect();
            parts.push(TemplatePart::Expression {
                source: expr_source.trim().to_string(),
                position: Position { offset: start },
            });
            i = j + 2;
        } else {
            static_buf.push(chars[i]);
            i += 1;
        }
    }

    if !static_buf.is_empty() {
        parts.push(TemplatePart::Static(static_buf));
    }

    Ok(parts)
}
