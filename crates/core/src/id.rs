//! Strongly-typed identifiers for execution-core entities.
//!
//! Each identifier wraps a UUID behind a domain marker so the compiler
//! rejects mixing, say, a [`NodeExecutionId`] where an [`ExecutionId`] is
//! expected. All are `Copy`, 16 bytes, and serialize as plain UUID strings.

use domain_key::define_uuid;

pub use domain_key::UuidParseError;

define_uuid!(WorkflowIdDomain => WorkflowId);
define_uuid!(ExecutionIdDomain => ExecutionId);
define_uuid!(NodeExecutionIdDomain => NodeExecutionId);
define_uuid!(ExecutionLogIdDomain => ExecutionLogId);
