//! Journal-local errors (spec §7: "retried with bounded backoff; do not
//! change execution status").

use flowcore_core::ExecutionId;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JournalError {
    #[error("execution not found: {0}")]
    ExecutionNotFound(ExecutionId),

    #[error("write failed: {0}")]
    WriteFailed(String),
}

pub type JournalResult<T> = Result<T, JournalError>;
