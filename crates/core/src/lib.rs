//! # flowcore-core
//!
//! Shared identifiers, value types, and narrow capability interfaces used
//! across the workflow execution core. Every other crate in the workspace
//! depends on this one; it depends on nothing else internal.

pub mod clock;
pub mod environment;
pub mod id;
pub mod key;
pub mod providers;
pub mod secure;

pub use clock::{Clock, FixedClock, SteppingClock, SystemClock};
pub use environment::Environment;
pub use id::{ExecutionId, ExecutionLogId, NodeExecutionId, UuidParseError, WorkflowId};
pub use key::{Key, KeyParseError};
pub use providers::{
    CredentialError, CredentialProvider, EnvironmentProvider, LayeredEnvironmentProvider,
    ProcessEnvironmentProvider,
};
pub use secure::SecureString;

/// The dynamic value type flowing through the execution core: trigger
/// payloads, node inputs/outputs, workflow variables, and expression
/// results are all JSON-shaped.
pub type Value = serde_json::Value;

/// Common prelude for downstream crates.
pub mod prelude {
    pub use crate::{
        Clock, CredentialError, CredentialProvider, Environment, EnvironmentProvider,
        ExecutionId, ExecutionLogId, Key, KeyParseError, NodeExecutionId, SecureString,
        SystemClock, Value, WorkflowId,
    };
}
