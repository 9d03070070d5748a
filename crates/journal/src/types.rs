//! Journal row shapes (spec §3, §4.5): `WorkflowExecution`, `NodeExecution`,
//! `ExecutionLog`, and their status enums.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use flowcore_core::{Environment, ExecutionId, ExecutionLogId, Key, NodeExecutionId, Value, WorkflowId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Success,
    Error,
    Canceled,
    Timeout,
}

impl ExecutionStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Error | Self::Canceled | Self::Timeout)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Pending,
    Running,
    Success,
    Error,
    Skipped,
    Canceled,
}

impl NodeStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerMode {
    Manual,
    Webhook,
    Schedule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ExecutionCounters {
    pub executed: u32,
    pub skipped: u32,
    pub failed: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowExecution {
    pub id: ExecutionId,
    pub workflow_id: WorkflowId,
    pub environment: Environment,
    pub status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub trigger_mode: TriggerMode,
    pub trigger_data: Value,
    pub error_message: Option<String>,
    pub duration_ms: Option<u64>,
    pub counters: ExecutionCounters,
    pub execution_path: Vec<Key>,
}

impl WorkflowExecution {
    pub fn new(
        workflow_id: WorkflowId,
        environment: Environment,
        trigger_mode: TriggerMode,
        trigger_data: Value,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ExecutionId::v4(),
            workflow_id,
            environment,
            status: ExecutionStatus::Running,
            started_at,
            finished_at: None,
            trigger_mode,
            trigger_data,
            error_message: None,
            duration_ms: None,
            counters: ExecutionCounters::default(),
            execution_path: Vec::new(),
        }
    }

    pub fn finish(&mut self, status: ExecutionStatus, finished_at: DateTime<Utc>, error_message: Option<String>) {
        self.status = status;
        self.finished_at = Some(finished_at);
        self.error_message = error_message;
        self.duration_ms = Some((finished_at - self.started_at).num_milliseconds().max(0) as u64);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeExecution {
    pub id: NodeExecutionId,
    pub execution_id: ExecutionId,
    pub node_id: Key,
    pub node_name: String,
    pub status: NodeStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub input_data: Value,
    pub output_data: Option<Value>,
    pub error_message: Option<String>,
    pub retry_count: u32,
    pub duration_ms: Option<u64>,
    pub execution_order: u64,
}

impl NodeExecution {
    pub fn new(
        execution_id: ExecutionId,
        node_id: Key,
        node_name: impl Into<String>,
        input_data: Value,
        started_at: DateTime<Utc>,
        execution_order: u64,
    ) -> Self {
        Self {
            id: NodeExecutionId::v4(),
            execution_id,
            node_id,
            node_name: node_name.into(),
            status: NodeStatus::Pending,
            started_at,
            finished_at: None,
            input_data,
            output_data: None,
            error_message: None,
            retry_count: 0,
            duration_ms: None,
            execution_order,
        }
    }

    pub fn finish(&mut self, status: NodeStatus, finished_at: DateTime<Utc>, output_data: Option<Value>, error_message: Option<String>) {
        self.status = status;
        self.finished_at = Some(finished_at);
        self.output_data = output_data;
        self.error_message = error_message;
        self.duration_ms = Some((finished_at - self.started_at).num_milliseconds().max(0) as u64);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionLog {
    pub id: ExecutionLogId,
    pub execution_id: ExecutionId,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    pub node_id: Option<Key>,
    pub node_name: Option<String>,
    pub metadata: HashMap<String, Value>,
    /// Breaks ties within the same `timestamp` (spec §3: "consumers... must
    /// preserve insertion order on ties").
    pub insertion_sequence: u64,
}

impl ExecutionLog {
    pub fn new(execution_id: ExecutionId, timestamp: DateTime<Utc>, level: LogLevel, message: impl Into<String>, insertion_sequence: u64) -> Self {
        Self {
            id: ExecutionLogId::v4(),
            execution_id,
            timestamp,
            level,
            message: message.into(),
            node_id: None,
            node_name: None,
            metadata: HashMap::new(),
            insertion_sequence,
        }
    }

    pub fn with_node(mut self, node_id: Key, node_name: impl Into<String>) -> Self {
        self.node_id = Some(node_id);
        self.node_name = Some(node_name.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}
