//! # flowcore-workflow
//!
//! The authored data model: [`Workflow`], [`WorkflowDefinition`], [`Node`],
//! and [`Connection`] (spec §3). This crate has no execution logic — it is
//! the shape the Graph Scheduler (`flowcore-engine`) consumes.

pub mod connection;
pub mod definition;
pub mod node;
pub mod workflow;

pub use connection::{outputs, Connection};
pub use definition::{ExecutionMode, Settings, WorkflowDefinition};
pub use node::{Node, RetrySettings};
pub use workflow::Workflow;
