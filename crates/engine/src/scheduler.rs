//! The graph scheduler itself: drives a `Workflow` to completion against
//! the node runtime, the execution journal, and the broadcast bus
//! (spec §4.4, component C4).

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::{Map, Value};
use tokio::sync::Semaphore;
use tokio::time::Instant;

use flowcore_core::{Clock, EnvironmentProvider, ExecutionId, Key, ProcessEnvironmentProvider, SystemClock, WorkflowId};
use flowcore_error::{DefinitionError, NodeError, NodeErrorKind};
use flowcore_eventbus::{EventBus, ExecutionEvent};
use flowcore_graph::ExecutionGraph;
use flowcore_journal::{
    ExecutionCounters, ExecutionLog, ExecutionStatus, Journal, LogLevel, NodeExecution, NodeStatus, TriggerMode, WorkflowExecution,
};
use flowcore_node::{
    with_cancellation, Attempt, CancelOutcome, CancellationHandle, ExecutionContext, NodeExecutor, NodeRegistry, NodeResult,
};
use flowcore_workflow::{ExecutionMode, Node, Workflow, WorkflowDefinition};

use crate::config::EngineConfig;
use crate::parameters::{resolve_parameters_bounded, ResolutionInputs};

/// Drives workflow executions against a fixed node registry. Construct one
/// per process; `execute` is safe to call concurrently, bounded by
/// `EngineConfig::max_concurrent_executions`.
pub struct Engine {
    registry: Arc<NodeRegistry>,
    journal: Arc<Journal>,
    events: Arc<EventBus>,
    clock: Arc<dyn Clock>,
    environment: Arc<dyn EnvironmentProvider>,
    config: EngineConfig,
    execution_semaphore: Arc<Semaphore>,
}

impl Engine {
    pub fn new(registry: Arc<NodeRegistry>, journal: Arc<Journal>, events: Arc<EventBus>) -> Self {
        let config = EngineConfig::from_env();
        Self {
            registry,
            journal,
            events,
            clock: Arc::new(SystemClock),
            environment: Arc::new(ProcessEnvironmentProvider),
            execution_semaphore: Arc::new(Semaphore::new(config.max_concurrent_executions.max(1))),
            config,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.execution_semaphore = Arc::new(Semaphore::new(config.max_concurrent_executions.max(1)));
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_environment(mut self, environment: Arc<dyn EnvironmentProvider>) -> Self {
        self.environment = environment;
        self
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Runs `workflow` to completion. Rejects the definition synchronously
    /// (no `WorkflowExecution` row written) if the graph is malformed or
    /// references an unregistered node kind; otherwise always returns
    /// `Ok`, the terminal status living in the returned row.
    #[tracing::instrument(skip(self, workflow, trigger_payload, cancel), fields(workflow_id = %workflow.id))]
    pub async fn execute(
        &self,
        workflow: &Workflow,
        trigger_mode: TriggerMode,
        trigger_payload: Value,
        cancel: CancellationHandle,
    ) -> Result<WorkflowExecution, DefinitionError> {
        let graph = ExecutionGraph::build(&workflow.definition)?;
        for node in &workflow.definition.nodes {
            if !self.registry.contains(&node.kind_key) {
                return Err(DefinitionError::UnknownNodeKind(node.kind_key.clone()));
            }
        }

        let _permit = self
            .execution_semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("execution semaphore is never closed");

        let started_at = self.clock.now();
        let execution = WorkflowExecution::new(workflow.id, workflow.environment, trigger_mode, trigger_payload.clone(), started_at);
        let execution_id = execution.id;

        self.events.publish(ExecutionEvent::ExecutionStarted {
            execution_id,
            execution: execution.clone(),
        });
        self.journal.insert_execution(execution);
        tracing::info!(execution_id = %execution_id, "execution started");

        let internal_cancel = cancel.child();
        let outcome = self
            .run_graph(&graph, &workflow.definition, execution_id, workflow.id, trigger_payload, &internal_cancel)
            .await;

        let finished_at = self.clock.now();
        self.journal
            .update_execution(execution_id, |e| {
                e.finish(outcome.status, finished_at, outcome.error_message.clone());
                e.counters = outcome.counters;
                e.execution_path = outcome.execution_path.clone();
            })
            .expect("execution row was inserted at the start of this call");

        self.events.publish(ExecutionEvent::ExecutionCompleted { execution_id, status: outcome.status });
        self.events.remove(execution_id);
        tracing::info!(execution_id = %execution_id, status = ?outcome.status, "execution finished");

        Ok(self.journal.get(execution_id, false, false).expect("execution row exists").execution)
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_graph(
        &self,
        graph: &ExecutionGraph,
        def: &WorkflowDefinition,
        execution_id: ExecutionId,
        workflow_id: WorkflowId,
        trigger_payload: Value,
        cancel: &CancellationHandle,
    ) -> GraphOutcome {
        let concurrency = match def.settings.execution_mode {
            ExecutionMode::Sequential => 1,
            ExecutionMode::Parallel => def.settings.max_concurrency.max(1),
        };
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let variables: Map<String, Value> = def.variables.iter().map(|(k, v)| (k.clone(), v.clone())).collect();

        let mut completed: HashSet<Key> = HashSet::new();
        let mut dispatched: HashSet<Key> = HashSet::new();
        let mut settled: HashMap<Key, Settled> = HashMap::new();
        let mut outputs_by_id: HashMap<Key, Value> = HashMap::new();
        let mut outputs_by_display: HashMap<String, Value> = HashMap::new();
        let mut execution_path: Vec<Key> = Vec::new();
        let mut counters = ExecutionCounters::default();
        let mut termination: Option<Termination> = None;
        let mut next_order: u64 = 0;
        let mut in_flight: FuturesUnordered<Pin<Box<dyn Future<Output = NodeRunResult> + Send>>> = FuturesUnordered::new();

        let execution_timeout = def.settings.execution_timeout.unwrap_or(self.config.default_execution_timeout);
        let deadline = Instant::now() + execution_timeout;

        loop {
            if termination.is_none() {
                let ready: Vec<Key> = graph
                    .ready(&completed)
                    .into_iter()
                    .filter(|id| !dispatched.contains(id))
                    .collect();

                for node_id in ready {
                    if Instant::now() >= deadline {
                        termination = Some(Termination::ExecutionTimeout);
                        cancel.cancel();
                        break;
                    }
                    if cancel.is_cancelled() {
                        termination = Some(Termination::ExternalCancel);
                        break;
                    }

                    let node = def.node(&node_id).expect("node ids in the graph come from this definition");

                    if !node.enabled {
                        mark_skipped(&self.journal, &self.events, &self.clock, execution_id, node, next_order, "node disabled");
                        next_order += 1;
                        completed.insert(node_id.clone());
                        settled.insert(node_id.clone(), Settled::Other);
                        execution_path.push(node_id);
                        counters.skipped += 1;
                        continue;
                    }

                    if !is_live(graph, &node_id, &settled) {
                        mark_skipped(&self.journal, &self.events, &self.clock, execution_id, node, next_order, "pruned: no live predecessor edge");
                        next_order += 1;
                        completed.insert(node_id.clone());
                        settled.insert(node_id.clone(), Settled::Other);
                        execution_path.push(node_id);
                        counters.skipped += 1;
                        continue;
                    }

                    let input = assemble_input(graph, &node_id, &trigger_payload, &settled, &outputs_by_id);
                    let order = next_order;
                    next_order += 1;
                    dispatched.insert(node_id.clone());

                    let permit = semaphore.clone().acquire_owned().await.expect("workflow semaphore is never closed");
                    let remaining = deadline.saturating_duration_since(Instant::now());

                    let fut = run_node(
                        self.registry.clone(),
                        self.journal.clone(),
                        self.events.clone(),
                        self.clock.clone(),
                        self.environment.clone(),
                        self.config.clone(),
                        execution_id,
                        workflow_id,
                        node.clone(),
                        input,
                        variables.clone(),
                        outputs_by_display.clone(),
                        cancel.child(),
                        order,
                        remaining,
                    );
                    in_flight.push(Box::pin(async move {
                        let _permit = permit;
                        fut.await
                    }));
                }
            }

            if in_flight.is_empty() {
                break;
            }

            let result = tokio::select! {
                biased;
                () = cancel.cancelled(), if termination.is_none() => {
                    termination = Some(Termination::ExternalCancel);
                    continue;
                }
                result = in_flight.next() => result.expect("in_flight is non-empty"),
            };

            dispatched.remove(&result.node_id);
            completed.insert(result.node_id.clone());
            execution_path.push(result.node_id.clone());

            match result.status {
                NodeStatus::Success => {
                    counters.executed += 1;
                    settled.insert(result.node_id.clone(), Settled::Success { branch: result.branch.clone() });
                    if let Some(data) = result.data {
                        outputs_by_id.insert(result.node_id.clone(), data.clone());
                        outputs_by_display.insert(result.display_name.clone(), data);
                    }
                }
                NodeStatus::Error => {
                    counters.failed += 1;
                    settled.insert(result.node_id.clone(), Settled::Other);
                    if termination.is_none() {
                        let message = result.error_message.clone().unwrap_or_else(|| "node execution failed".to_string());
                        termination = Some(Termination::NodeFailed(message));
                        if def.settings.execution_mode == ExecutionMode::Parallel {
                            cancel.cancel();
                        }
                    }
                }
                NodeStatus::Canceled => {
                    counters.failed += 1;
                    settled.insert(result.node_id.clone(), Settled::Other);
                }
                NodeStatus::Skipped | NodeStatus::Pending | NodeStatus::Running => {
                    unreachable!("run_node only resolves to a terminal in-flight status")
                }
            }
        }

        let status = match &termination {
            Some(Termination::NodeFailed(_)) => ExecutionStatus::Error,
            Some(Termination::ExternalCancel) => ExecutionStatus::Canceled,
            Some(Termination::ExecutionTimeout) => ExecutionStatus::Timeout,
            None => ExecutionStatus::Success,
        };
        let error_message = match termination {
            Some(Termination::NodeFailed(message)) => Some(message),
            _ => None,
        };

        GraphOutcome {
            status,
            error_message,
            execution_path,
            counters,
        }
    }
}

struct GraphOutcome {
    status: ExecutionStatus,
    error_message: Option<String>,
    execution_path: Vec<Key>,
    counters: ExecutionCounters,
}

/// Why a node's outbound edges are live for downstream liveness decisions.
/// `Other` covers Error, Canceled, and Skipped alike: none of them carry a
/// live branch forward.
#[derive(Debug, Clone)]
enum Settled {
    Success { branch: Option<String> },
    Other,
}

enum Termination {
    NodeFailed(String),
    ExternalCancel,
    ExecutionTimeout,
}

struct NodeRunResult {
    node_id: Key,
    display_name: String,
    status: NodeStatus,
    data: Option<Value>,
    branch: Option<String>,
    error_message: Option<String>,
}

fn has_live_edge(graph: &ExecutionGraph, pred: &Key, target: &Key, settled: &HashMap<Key, Settled>) -> bool {
    match settled.get(pred) {
        Some(Settled::Success { branch }) => graph.successors(pred, branch.as_deref()).iter().any(|s| s == target),
        _ => false,
    }
}

/// A root is always live. Any other node is live only if at least one
/// predecessor succeeded and took an edge reaching it — this is Merge's
/// own contract (spec §4.7: Merge) generalized to every node, per
/// `ExecutionContext.input`'s doc: "an array when several predecessors
/// feed this node".
fn is_live(graph: &ExecutionGraph, node_id: &Key, settled: &HashMap<Key, Settled>) -> bool {
    let preds = graph.predecessors(node_id);
    if preds.is_empty() {
        return true;
    }
    preds.iter().any(|p| has_live_edge(graph, p, node_id, settled))
}

/// `predecessors` is unsorted, so this sorts ascending by id to give
/// `context.input`'s array a deterministic, author-independent order.
fn assemble_input(graph: &ExecutionGraph, node_id: &Key, trigger_payload: &Value, settled: &HashMap<Key, Settled>, outputs: &HashMap<Key, Value>) -> Value {
    let mut preds = graph.predecessors(node_id);
    if preds.is_empty() {
        return trigger_payload.clone();
    }
    preds.sort_by(|a, b| a.as_str().cmp(b.as_str()));

    let mut values: Vec<Value> = preds
        .iter()
        .map(|p| {
            if has_live_edge(graph, p, node_id, settled) {
                outputs.get(p).cloned().unwrap_or(Value::Null)
            } else {
                Value::Null
            }
        })
        .collect();

    if values.len() == 1 {
        values.remove(0)
    } else {
        Value::Array(values)
    }
}

fn mark_skipped(journal: &Journal, events: &EventBus, clock: &Arc<dyn Clock>, execution_id: ExecutionId, node: &Node, order: u64, reason: &str) {
    let now = clock.now();
    let mut node_exec = NodeExecution::new(execution_id, node.id.clone(), node.display_name.clone(), Value::Null, now, order);
    node_exec.finish(NodeStatus::Skipped, now, None, Some(reason.to_string()));
    journal.upsert_node_execution(node_exec);
    events.publish(ExecutionEvent::NodeExecutionCompleted {
        execution_id,
        node_id: node.id.clone(),
        status: NodeStatus::Skipped,
    });
}

/// Switch's own executor emits no flag for having taken its fallback
/// output — it just returns a branch like any other case. The engine
/// infers it here, from the same `fallbackOutput` parameter Switch itself
/// reads, and records it as log metadata for operator visibility.
fn branch_is_fallback(parameters: &Map<String, Value>, branch: Option<&str>) -> bool {
    let Some(branch) = branch else { return false };
    match parameters.get("fallbackOutput").and_then(Value::as_i64) {
        Some(index) if index >= 0 => branch == index.to_string(),
        _ => false,
    }
}

fn terminal_status_for(kind: NodeErrorKind) -> NodeStatus {
    if kind == NodeErrorKind::Cancelled {
        NodeStatus::Canceled
    } else {
        NodeStatus::Error
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_node(
    registry: Arc<NodeRegistry>,
    journal: Arc<Journal>,
    events: Arc<EventBus>,
    clock: Arc<dyn Clock>,
    environment: Arc<dyn EnvironmentProvider>,
    config: EngineConfig,
    execution_id: ExecutionId,
    workflow_id: WorkflowId,
    node: Node,
    input: Value,
    variables: Map<String, Value>,
    node_outputs: HashMap<String, Value>,
    cancellation: CancellationHandle,
    execution_order: u64,
    remaining_execution_time: Duration,
) -> NodeRunResult {
    let executor: Arc<dyn NodeExecutor> = registry
        .get(&node.kind_key)
        .expect("node kind was checked against the registry at Execute entry");

    let started_at = clock.now();
    let mut node_exec = NodeExecution::new(execution_id, node.id.clone(), node.display_name.clone(), input.clone(), started_at, execution_order);
    journal.upsert_node_execution(node_exec.clone());
    node_exec.status = NodeStatus::Running;
    journal.upsert_node_execution(node_exec.clone());
    events.publish(ExecutionEvent::NodeExecutionStarted {
        execution_id,
        node_id: node.id.clone(),
    });

    let retry = node.retry_settings_or_default();
    let node_timeout = node.timeout.unwrap_or(config.default_node_timeout).min(remaining_execution_time);
    let mut attempt: u32 = 0;

    loop {
        let log = ExecutionLog::new(execution_id, clock.now(), LogLevel::Debug, format!("request-attempt-{attempt}"), 0)
            .with_node(node.id.clone(), node.display_name.clone());
        events.publish(ExecutionEvent::ExecutionLog { execution_id, log: log.clone() });
        journal.append_log(log);
        journal.flush_logs();

        let resolution_inputs = ResolutionInputs {
            workflow_id: workflow_id.to_string(),
            variables: variables.clone(),
            node_outputs: node_outputs.clone(),
            json_item: input.clone(),
            raw_parameters: node.parameters.clone(),
        };

        let parameters = match resolve_parameters_bounded(environment.clone(), resolution_inputs, config.expression_timeout).await {
            Ok(parameters) => parameters,
            Err(resolution_err) => {
                let kind = resolution_err.node_error_kind();
                if kind.is_retryable() && attempt < retry.max_retries {
                    tokio::time::sleep(retry.backoff_for_attempt(attempt)).await;
                    attempt += 1;
                    node_exec.retry_count = attempt;
                    journal.upsert_node_execution(node_exec.clone());
                    continue;
                }
                let error = NodeError::new(kind, "parameter resolution failed").with_cause(resolution_err.to_string());
                return finalize(&journal, &events, &clock, node_exec, execution_id, &node, terminal_status_for(kind), None, Some(error));
            }
        };

        if let Err(error) = executor.definition().validate_parameters(&parameters) {
            let status = terminal_status_for(error.kind);
            return finalize(&journal, &events, &clock, node_exec, execution_id, &node, status, None, Some(error));
        }

        let exec_ctx = ExecutionContext::new(execution_id, node_exec.id, workflow_id, node.id.clone())
            .with_input(input.clone())
            .with_cancellation(cancellation.child())
            .with_attempt(if attempt == 0 { Attempt::First } else { Attempt::Retry(attempt) })
            .with_variables(variables.clone())
            .with_environment(environment.clone());

        let invocation = with_cancellation(&cancellation, Some(node_timeout), executor.execute(parameters.clone(), &exec_ctx)).await;

        match invocation {
            Ok(NodeResult::Success { data, branch }) => {
                if node.kind_key.as_str() == "switch" && branch_is_fallback(&parameters, branch.as_deref()) {
                    let log = ExecutionLog::new(execution_id, clock.now(), LogLevel::Info, "switch took its fallback branch", 0)
                        .with_node(node.id.clone(), node.display_name.clone())
                        .with_metadata("isFallback", Value::Bool(true));
                    events.publish(ExecutionEvent::ExecutionLog { execution_id, log: log.clone() });
                    journal.append_log(log);
                    journal.flush_logs();
                }

                let finished_at = clock.now();
                node_exec.finish(NodeStatus::Success, finished_at, Some(data.clone()), None);
                journal.upsert_node_execution(node_exec.clone());
                events.publish(ExecutionEvent::NodeExecutionCompleted {
                    execution_id,
                    node_id: node.id.clone(),
                    status: NodeStatus::Success,
                });
                return NodeRunResult {
                    node_id: node.id.clone(),
                    display_name: node.display_name.clone(),
                    status: NodeStatus::Success,
                    data: Some(data),
                    branch,
                    error_message: None,
                };
            }
            Ok(NodeResult::Error { error }) => {
                if error.kind.is_retryable() && attempt < retry.max_retries {
                    tokio::time::sleep(retry.backoff_for_attempt(attempt)).await;
                    attempt += 1;
                    node_exec.retry_count = attempt;
                    journal.upsert_node_execution(node_exec.clone());
                    continue;
                }
                let status = terminal_status_for(error.kind);
                return finalize(&journal, &events, &clock, node_exec, execution_id, &node, status, None, Some(error));
            }
            Err(CancelOutcome::Cancelled) => {
                let error = NodeError::new(NodeErrorKind::Cancelled, "execution canceled");
                return finalize(&journal, &events, &clock, node_exec, execution_id, &node, NodeStatus::Canceled, None, Some(error));
            }
            Err(CancelOutcome::TimedOut) => {
                if attempt < retry.max_retries {
                    tokio::time::sleep(retry.backoff_for_attempt(attempt)).await;
                    attempt += 1;
                    node_exec.retry_count = attempt;
                    journal.upsert_node_execution(node_exec.clone());
                    continue;
                }
                let error = NodeError::new(NodeErrorKind::Timeout, "node execution timed out");
                return finalize(&journal, &events, &clock, node_exec, execution_id, &node, NodeStatus::Error, None, Some(error));
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn finalize(
    journal: &Journal,
    events: &EventBus,
    clock: &Arc<dyn Clock>,
    mut node_exec: NodeExecution,
    execution_id: ExecutionId,
    node: &Node,
    status: NodeStatus,
    data: Option<Value>,
    error: Option<NodeError>,
) -> NodeRunResult {
    let message = error.as_ref().map(|e| match e.cause_first_line() {
        Some(cause) => format!("{e}: {cause}"),
        None => e.to_string(),
    });
    let finished_at = clock.now();
    node_exec.finish(status, finished_at, data.clone(), message.clone());
    journal.upsert_node_execution(node_exec);
    events.publish(ExecutionEvent::NodeExecutionCompleted {
        execution_id,
        node_id: node.id.clone(),
        status,
    });
    NodeRunResult {
        node_id: node.id.clone(),
        display_name: node.display_name.clone(),
        status,
        data,
        branch: None,
        error_message: message,
    }
}
