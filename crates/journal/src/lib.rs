//! # flowcore-journal
//!
//! Durable recording of `WorkflowExecution`, `NodeExecution`, and
//! `ExecutionLog` rows, with the read queries the engine and operator
//! tooling need (spec §4.5). In-memory today, behind the same shape a
//! real persistence backend would expose.

pub mod error;
pub mod log_buffer;
pub mod query;
pub mod stats;
pub mod store;
pub mod types;

pub use error::{JournalError, JournalResult};
pub use log_buffer::{LogBuffer, LogBufferConfig};
pub use query::{ExecutionFilter, Page, PagedResult};
pub use stats::ExecutionStats;
pub use store::{ExecutionDetail, Journal};
pub use types::{
    ExecutionCounters, ExecutionLog, ExecutionStatus, LogLevel, NodeExecution, NodeStatus,
    TriggerMode, WorkflowExecution,
};
