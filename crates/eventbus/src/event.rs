//! Broadcast event kinds (spec §4.6).

use flowcore_core::{ExecutionId, Key};
use flowcore_journal::{ExecutionLog, ExecutionStatus, NodeStatus, WorkflowExecution};

#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    ExecutionStarted {
        execution_id: ExecutionId,
        execution: WorkflowExecution,
    },
    ExecutionCompleted {
        execution_id: ExecutionId,
        status: ExecutionStatus,
    },
    NodeExecutionStarted {
        execution_id: ExecutionId,
        node_id: Key,
    },
    NodeExecutionCompleted {
        execution_id: ExecutionId,
        node_id: Key,
        status: NodeStatus,
    },
    ExecutionLog {
        execution_id: ExecutionId,
        log: ExecutionLog,
    },
}

impl ExecutionEvent {
    #[must_use]
    pub fn execution_id(&self) -> ExecutionId {
        match self {
            Self::ExecutionStarted { execution_id, .. }
            | Self::ExecutionCompleted { execution_id, .. }
            | Self::NodeExecutionStarted { execution_id, .. }
            | Self::NodeExecutionCompleted { execution_id, .. }
            | Self::ExecutionLog { execution_id, .. } => *execution_id,
        }
    }

    /// Whether this event also goes out on the global channel (spec §4.6:
    /// "except `ExecutionStarted`/`ExecutionCompleted` which are also
    /// fanned out on a global channel").
    #[must_use]
    pub fn is_global(&self) -> bool {
        matches!(self, Self::ExecutionStarted { .. } | Self::ExecutionCompleted { .. })
    }
}
