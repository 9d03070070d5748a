//! `ExecutionContext`: runtime handle an executor receives alongside its
//! resolved parameters (spec §4.2). Kept independent of the expression
//! evaluator — expression evaluation is an engine/nodes-layer concern,
//! not part of the node runtime contract itself.

use std::sync::Arc;

use flowcore_core::{CredentialProvider, EnvironmentProvider, ExecutionId, Key, NodeExecutionId, WorkflowId};
use parking_lot::RwLock;
use serde_json::{Map, Value};

use crate::cancel::CancellationHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    First,
    Retry(u32),
}

/// Runtime context provided to every executor during [`crate::NodeExecutor::execute`].
///
/// Constructed by the engine before invoking a node; carries identity
/// (which execution, workflow, node this is), shared workflow-scoped
/// variables, and the cancellation handle. Executors must check
/// cancellation cooperatively in long-running loops.
#[non_exhaustive]
pub struct ExecutionContext {
    pub execution_id: ExecutionId,
    pub node_execution_id: NodeExecutionId,
    pub workflow_id: WorkflowId,
    pub node_id: Key,
    pub attempt: Attempt,
    pub cancellation: CancellationHandle,
    /// The node's upstream data: a single predecessor's output `data`, an
    /// array when several predecessors feed this node (e.g. a Merge's
    /// inbound edges), or the trigger payload for a root node. Nodes that
    /// combine or pass through data (Set, Merge, Split, Function) read
    /// this rather than re-deriving it through an expression.
    pub input: Value,
    variables: Arc<RwLock<Map<String, Value>>>,
    credentials: Option<Arc<dyn CredentialProvider>>,
    environment: Option<Arc<dyn EnvironmentProvider>>,
}

impl ExecutionContext {
    pub fn new(
        execution_id: ExecutionId,
        node_execution_id: NodeExecutionId,
        workflow_id: WorkflowId,
        node_id: Key,
    ) -> Self {
        Self {
            execution_id,
            node_execution_id,
            workflow_id,
            node_id,
            attempt: Attempt::First,
            cancellation: CancellationHandle::new(),
            input: Value::Null,
            variables: Arc::new(RwLock::new(Map::new())),
            credentials: None,
            environment: None,
        }
    }

    pub fn with_input(mut self, input: Value) -> Self {
        self.input = input;
        self
    }

    pub fn with_cancellation(mut self, handle: CancellationHandle) -> Self {
        self.cancellation = handle;
        self
    }

    pub fn with_attempt(mut self, attempt: Attempt) -> Self {
        self.attempt = attempt;
        self
    }

    pub fn with_variables(mut self, variables: Map<String, Value>) -> Self {
        self.variables = Arc::new(RwLock::new(variables));
        self
    }

    pub fn with_credentials(mut self, provider: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = Some(provider);
        self
    }

    pub fn with_environment(mut self, provider: Arc<dyn EnvironmentProvider>) -> Self {
        self.environment = Some(provider);
        self
    }

    #[must_use]
    pub fn get_variable(&self, key: &str) -> Option<Value> {
        self.variables.read().get(key).cloned()
    }

    pub fn set_variable(&self, key: &str, value: Value) {
        self.variables.write().insert(key.to_owned(), value);
    }

    /// Resolves a credential reference via the configured provider.
    ///
    /// # Errors
    ///
    /// Returns `None` if no provider is attached or the reference is
    /// unknown to it; node executors surface that as a validation error.
    pub async fn credential(&self, reference: &str) -> Option<flowcore_core::SecureString> {
        match &self.credentials {
            Some(provider) => provider.get(reference).await.ok(),
            None => None,
        }
    }

    #[must_use]
    pub fn env(&self, name: &str) -> Option<String> {
        self.environment.as_ref().and_then(|p| p.get(name))
    }

    /// The configured environment provider, for callers (e.g. the Code and
    /// Function nodes) that need to hand it to the expression evaluator
    /// rather than read a single variable.
    #[must_use]
    pub fn environment_provider(&self) -> Option<&dyn EnvironmentProvider> {
        self.environment.as_deref()
    }

    /// A snapshot of the shared workflow variables, for handing to the
    /// expression evaluator's `$workflow.variables` accessor.
    #[must_use]
    pub fn variables_snapshot(&self) -> Map<String, Value> {
        self.variables.read().clone()
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("execution_id", &self.execution_id)
            .field("node_execution_id", &self.node_execution_id)
            .field("workflow_id", &self.workflow_id)
            .field("node_id", &self.node_id)
            .field("attempt", &self.attempt)
            .field("cancelled", &self.cancellation.is_cancelled())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn test_context() -> ExecutionContext {
        ExecutionContext::new(
            ExecutionId::v4(),
            NodeExecutionId::v4(),
            WorkflowId::v4(),
            Key::from_str("my_node").unwrap(),
        )
    }

    #[test]
    fn get_set_variable() {
        let ctx = test_context();
        assert!(ctx.get_variable("count").is_none());
        ctx.set_variable("count", serde_json::json!(42));
        assert_eq!(ctx.get_variable("count"), Some(serde_json::json!(42)));
    }

    #[test]
    fn overwrite_variable() {
        let ctx = test_context();
        ctx.set_variable("name", serde_json::json!("alice"));
        ctx.set_variable("name", serde_json::json!("bob"));
        assert_eq!(ctx.get_variable("name"), Some(serde_json::json!("bob")));
    }

    #[test]
    fn not_cancelled_by_default() {
        let ctx = test_context();
        assert!(!ctx.is_cancelled());
    }

    #[test]
    fn cancellation_propagates_from_handle() {
        let ctx = test_context();
        ctx.cancellation.cancel();
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn env_without_provider_is_none() {
        let ctx = test_context();
        assert_eq!(ctx.env("PATH"), None);
    }

    #[test]
    fn debug_format_does_not_panic() {
        let ctx = test_context();
        let debug = format!("{ctx:?}");
        assert!(debug.contains("ExecutionContext"));
    }
}
