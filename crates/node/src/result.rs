//! `NodeResult`: the sum type every executor returns (spec §4.2, §9).
//!
//! Modeled as a tagged variant rather than an error-trait hierarchy —
//! `branch` carries which named output edge is live for If/Switch-style
//! routing; `None` means every outbound edge is live.

use flowcore_core::Value;
use flowcore_error::NodeError;

#[derive(Debug, Clone)]
pub enum NodeResult {
    Success { data: Value, branch: Option<String> },
    Error { error: NodeError },
}

impl NodeResult {
    #[must_use]
    pub fn success(data: Value) -> Self {
        Self::Success { data, branch: None }
    }

    #[must_use]
    pub fn success_on_branch(data: Value, branch: impl Into<String>) -> Self {
        Self::Success {
            data,
            branch: Some(branch.into()),
        }
    }

    #[must_use]
    pub fn error(error: NodeError) -> Self {
        Self::Error { error }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    #[must_use]
    pub fn branch(&self) -> Option<&str> {
        match self {
            Self::Success { branch, .. } => branch.as_deref(),
            Self::Error { .. } => None,
        }
    }
}
