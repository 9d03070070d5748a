//! Error taxonomy for the expression evaluator (spec §4.3).
//!
//! The safety validator runs before evaluation and produces [`ExpressionError`]
//! variants under [`ErrorPhase::Validation`]; bound violations and runtime
//! failures during evaluation itself are [`ErrorPhase::Evaluation`]. The
//! scheduler keys its Validation-vs-Evaluation node-failure split off `phase`.

use thiserror::Error;

/// Which half of evaluation produced the error — matters to the caller
/// (the scheduler treats Validation failures as never-retried).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPhase {
    Validation,
    Evaluation,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("expression exceeds maximum length of {max} characters ({actual} found)")]
    TooLong { max: usize, actual: usize },

    #[error("expression nesting depth {actual} exceeds maximum of {max}")]
    NestingTooDeep { max: usize, actual: usize },

    #[error("expression has unbalanced delimiters")]
    UnbalancedDelimiters,

    #[error("expression references forbidden identifier: {0}")]
    ForbiddenIdentifier(String),

    #[error("expression contains a path-traversal marker")]
    PathTraversal,

    #[error("unclosed '{{{{' starting at offset {0}")]
    UnclosedExpression(usize),

    #[error("syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },

    #[error("undefined accessor: {0}")]
    UndefinedAccessor(String),

    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("function {name} expected {expected} argument(s), got {actual}")]
    ArityMismatch {
        name: String,
        expected: String,
        actual: usize,
    },

    #[error("type error: {0}")]
    TypeError(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("expression evaluation exceeded wall-clock budget of {0:?}")]
    WallClockExceeded(std::time::Duration),

    #[error("expression recursion depth exceeded maximum of {0}")]
    RecursionExceeded(usize),

    #[error("expression statement count exceeded maximum of {0}")]
    StatementCountExceeded(usize),

    #[error("expression exceeded memory cap of {0} bytes")]
    MemoryExceeded(usize),
}

impl ExpressionError {
    /// The failure-policy phase this error belongs to (spec §4.3: "Failure
    /// policy"). Parse/validator errors are always Validation; evaluator
    /// errors raised while walking the AST are Evaluation.
    #[must_use]
    pub fn phase(&self) -> ErrorPhase {
        match self {
            Self::TooLong { .. }
            | Self::NestingTooDeep { .. }
            | Self::UnbalancedDelimiters
            | Self::ForbiddenIdentifier(_)
            | Self::PathTraversal
            | Self::UnclosedExpression(_)
            | Self::Syntax { .. } => ErrorPhase::Validation,
            _ => ErrorPhase::Evaluation,
        }
    }
}

pub type ExpressionResult<T> = Result<T, ExpressionError>;
