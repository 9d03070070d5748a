//! Engine-level error types that don't belong in `flowcore-error` because
//! they're specific to how the scheduler drives parameter resolution.

use flowcore_error::NodeErrorKind;
use flowcore_expression::{ErrorPhase, ExpressionError};
use thiserror::Error;

/// Failure resolving a node's templated parameters, before the node itself
/// is ever invoked (spec §4.4 step 5).
#[derive(Debug, Error, Clone)]
pub enum ParameterResolutionError {
    #[error(transparent)]
    Expression(#[from] ExpressionError),
    /// The outer per-node expression-resolution guard fired
    /// (`EngineConfig::expression_timeout`), distinct from the expression
    /// evaluator's own internal wall-clock bound.
    #[error("parameter resolution exceeded the configured expression timeout")]
    TimedOut,
    /// The blocking task evaluating the templates panicked.
    #[error("parameter resolution task failed: {0}")]
    TaskFailed(String),
}

impl ParameterResolutionError {
    /// Maps to the category the scheduler uses for retry/terminal decisions.
    /// Validation-phase expression failures (syntax, forbidden identifiers,
    /// bounds on the source text) are never retried, matching
    /// `NodeErrorKind::Validation`'s own contract. Evaluation-phase failures
    /// (type errors, unknown accessors, division by zero) are treated as
    /// `NodeErrorKind::Execution` since they can depend on upstream data
    /// that may differ on retry. A resolution timeout maps to
    /// `NodeErrorKind::Timeout`, which is retryable.
    #[must_use]
    pub fn node_error_kind(&self) -> NodeErrorKind {
        match self {
            Self::Expression(err) => match err.phase() {
                ErrorPhase::Validation => NodeErrorKind::Validation,
                ErrorPhase::Evaluation => NodeErrorKind::Execution,
            },
            Self::TimedOut => NodeErrorKind::Timeout,
            Self::TaskFailed(_) => NodeErrorKind::Execution,
        }
    }
}
