//! `WorkflowDefinition`: nodes, connections, variables, settings (spec §3).

use std::collections::HashMap;
use std::time::Duration;

use flowcore_core::{Key, Value, WorkflowId};
use serde::{Deserialize, Serialize};

use crate::connection::Connection;
use crate::node::Node;

/// How the scheduler drives ready nodes: one at a time, or up to
/// `max_concurrency` concurrently (spec §3, §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Sequential,
    Parallel,
}

impl Default for ExecutionMode {
    fn default() -> Self {
        Self::Sequential
    }
}

fn default_max_concurrency() -> usize {
    5
}

/// Workflow-level execution settings (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub execution_mode: ExecutionMode,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default, with = "opt_duration_secs")]
    pub execution_timeout: Option<Duration>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub error_handler_workflow_id: Option<WorkflowId>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            execution_mode: ExecutionMode::default(),
            max_concurrency: default_max_concurrency(),
            execution_timeout: None,
            timezone: None,
            error_handler_workflow_id: None,
        }
    }
}

mod opt_duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        d.map(|d| d.as_secs()).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        let secs = Option::<u64>::deserialize(d)?;
        Ok(secs.map(Duration::from_secs))
    }
}

/// The authored content of a workflow: nodes, connections, variables, and
/// execution settings (spec §3: "WorkflowDefinition").
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorkflowDefinition {
    pub nodes: Vec<Node>,
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub variables: HashMap<String, Value>,
    #[serde(default)]
    pub settings: Settings,
}

impl WorkflowDefinition {
    pub fn new(nodes: Vec<Node>, connections: Vec<Connection>) -> Self {
        Self {
            nodes,
            connections,
            variables: HashMap::new(),
            settings: Settings::default(),
        }
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: Value) -> Self {
        self.variables.insert(name.into(), value);
        self
    }

    pub fn node(&self, id: &Key) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }
}
