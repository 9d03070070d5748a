//! The top-level `Workflow`: metadata plus an embedded [`WorkflowDefinition`].

use chrono::{DateTime, Utc};
use flowcore_core::{Environment, WorkflowId};
use serde::{Deserialize, Serialize};

use crate::definition::WorkflowDefinition;

/// Named, versioned workflow (spec §3). The core reads an immutable
/// snapshot at execute-time; authoring/versioning lives outside the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: WorkflowId,
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
    pub environment: Environment,
    pub version: u32,
    pub creator: String,
    pub parent_workflow_id: Option<WorkflowId>,
    pub definition: WorkflowDefinition,
    pub created_at: DateTime<Utc>,
}

impl Workflow {
    pub fn new(name: impl Into<String>, environment: Environment, definition: WorkflowDefinition) -> Self {
        Self {
            id: WorkflowId::v4(),
            name: name.into(),
            description: None,
            active: true,
            environment,
            version: 1,
            creator: String::new(),
            parent_workflow_id: None,
            definition,
            created_at: Utc::now(),
        }
    }
}
