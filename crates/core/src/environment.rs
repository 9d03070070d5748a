//! Workflow deployment environment.

use serde::{Deserialize, Serialize};

/// The environment a workflow (and its executions) belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Testing,
    Launched,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Testing => write!(f, "testing"),
            Self::Launched => write!(f, "launched"),
            Self::Production => write!(f, "production"),
        }
    }
}
