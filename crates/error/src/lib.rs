//! Shared error taxonomy (spec §7).
//!
//! Most crates define their own `thiserror` enum at their own boundary
//! (the reference workspace's per-crate convention). The types here are
//! the handful that genuinely cross crate boundaries: a definition is
//! rejected before any row is written, and a node failure needs a
//! category the scheduler can act on (retry or not) independent of which
//! crate produced it.

use flowcore_core::Key;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that reject a workflow definition before execution begins
/// (spec §7: "surfaced synchronously to the caller of Execute; no
/// WorkflowExecution row is written").
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("duplicate node id: {0}")]
    DuplicateNodeId(String),

    #[error("connection references unknown node: {0}")]
    UnknownNodeReference(String),

    #[error("graph contains a cycle")]
    Cycle,

    #[error("unknown node kind: {0}")]
    UnknownNodeKind(Key),

    #[error("invalid cron expression: {0}")]
    InvalidCron(String),

    #[error("node {node_id} failed parameter schema validation: {message}")]
    InvalidParameters { node_id: String, message: String },
}

/// Categorizes why a node execution ended in error, so the scheduler can
/// decide retry-vs-terminate without inspecting crate-specific error
/// types (spec §7: "Validation never retries").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeErrorKind {
    /// Parameter schema or expression-resolution failure. Never retried.
    Validation,
    /// The node's own logic returned failure or threw.
    Execution,
    /// A transport-level failure talking to an external service.
    External,
    /// The node's own timeout fired.
    Timeout,
    /// Cancellation propagated into the node.
    Cancelled,
}

impl NodeErrorKind {
    /// Whether the scheduler may retry a node that failed with this kind.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        !matches!(self, Self::Validation | Self::Cancelled)
    }
}

/// A node-level error: message, category, and optional upstream cause.
/// This is the `error` payload of a `NodeResult::Error` (spec §4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeError {
    pub message: String,
    pub kind: NodeErrorKind,
    pub cause: Option<String>,
}

impl NodeError {
    pub fn new(kind: NodeErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
            cause: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(NodeErrorKind::Validation, message)
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::new(NodeErrorKind::Execution, message)
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// The first line of [`Self::cause`], for the journal's user-visible
    /// failure summary (spec §7: "the first-line of any underlying cause").
    #[must_use]
    pub fn cause_first_line(&self) -> Option<&str> {
        self.cause.as_deref().and_then(|c| c.lines().next())
    }
}

impl std::fmt::Display for NodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)
    }
}

impl std::error::Error for NodeError {}
