//! Read-query shapes: filters and paging (spec §4.5).

use chrono::{DateTime, Utc};
use flowcore_core::{Environment, WorkflowId};

use crate::types::ExecutionStatus;

/// Filter for listing `WorkflowExecution`s. All fields are optional;
/// `None` means "don't filter on this dimension."
#[derive(Debug, Clone, Default)]
pub struct ExecutionFilter {
    pub workflow_id: Option<WorkflowId>,
    pub status: Option<ExecutionStatus>,
    pub environment: Option<Environment>,
    pub started_after: Option<DateTime<Utc>>,
    pub started_before: Option<DateTime<Utc>>,
}

impl ExecutionFilter {
    pub fn with_workflow(mut self, workflow_id: WorkflowId) -> Self {
        self.workflow_id = Some(workflow_id);
        self
    }

    pub fn with_status(mut self, status: ExecutionStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    pub fn with_time_window(mut self, after: DateTime<Utc>, before: DateTime<Utc>) -> Self {
        self.started_after = Some(after);
        self.started_before = Some(before);
        self
    }
}

/// Offset/limit paging request.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

impl Page {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self { offset: 0, limit: 50 }
    }
}

/// A page of results plus whether more remain beyond it.
#[derive(Debug, Clone)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub has_more: bool,
}
