//! End-to-end scheduler scenarios: linear chains, branching, parallel
//! fan-out with merge, retry, cancellation, and Switch fallback.

use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use flowcore_core::{Environment, Key};
use flowcore_engine::Engine;
use flowcore_error::{NodeError, NodeErrorKind};
use flowcore_eventbus::{EventBus, ExecutionEvent};
use flowcore_journal::{ExecutionFilter, ExecutionStatus, Journal, LogLevel, NodeStatus, Page, TriggerMode};
use flowcore_node::{CancellationHandle, ExecutionContext, NodeDefinition, NodeExecutor, NodeRegistry, NodeResult};
use flowcore_workflow::{outputs, Connection, ExecutionMode, Node, RetrySettings, Settings, Workflow, WorkflowDefinition};
use serde_json::{json, Value};

fn key(id: &str) -> Key {
    Key::new(id).unwrap()
}

fn registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    flowcore_nodes::register_builtin(&mut registry);
    registry
}

fn engine(registry: NodeRegistry) -> Engine {
    Engine::new(Arc::new(registry), Arc::new(Journal::new()), Arc::new(EventBus::new(64)))
}

/// 1. Linear chain: Start -> Set -> NoOp.
#[tokio::test]
async fn linear_chain_succeeds_with_expected_output() {
    let nodes = vec![
        Node::new("start", "start", "Start").unwrap(),
        Node::new("set", "set", "Set")
            .unwrap()
            .with_parameter("values", json!([{"name": "x", "value": "{{ 1 + 2 }}"}])),
        Node::new("noop", "noop", "NoOp").unwrap(),
    ];
    let connections = vec![Connection::main(key("start"), key("set")), Connection::main(key("set"), key("noop"))];
    let definition = WorkflowDefinition::new(nodes, connections);
    let workflow = Workflow::new("linear", Environment::Testing, definition);

    let eng = engine(registry());
    let execution = eng
        .execute(&workflow, TriggerMode::Manual, Value::Null, CancellationHandle::new())
        .await
        .unwrap();

    assert_eq!(execution.status, ExecutionStatus::Success);
    assert_eq!(execution.execution_path.len(), 3);

    let detail = eng_journal_detail(&eng, execution.id);
    let set_row = detail
        .node_executions
        .unwrap()
        .into_iter()
        .find(|n| n.node_id == key("set"))
        .unwrap();
    assert_eq!(set_row.output_data, Some(json!({"x": 3.0})));
}

/// 2. Conditional: Start -> If -> (true) SetTrue | (false) SetFalse, pruning the untaken branch.
#[tokio::test]
async fn conditional_prunes_the_untaken_branch() {
    let nodes = vec![
        Node::new("start", "start", "Start").unwrap(),
        Node::new("if", "if", "If")
            .unwrap()
            .with_parameter("condition", json!("{{ $node.Start.data.v > 10 }}")),
        Node::new("set_true", "set", "SetTrue")
            .unwrap()
            .with_parameter("values", json!([{"name": "r", "value": "hi"}])),
        Node::new("set_false", "set", "SetFalse")
            .unwrap()
            .with_parameter("values", json!([{"name": "r", "value": "lo"}])),
    ];
    let connections = vec![
        Connection::main(key("start"), key("if")),
        Connection::new(key("if"), outputs::TRUE, key("set_true"), "main"),
        Connection::new(key("if"), outputs::FALSE, key("set_false"), "main"),
    ];
    let definition = WorkflowDefinition::new(nodes, connections);
    let workflow = Workflow::new("conditional", Environment::Testing, definition);

    let eng = engine(registry());
    let execution = eng
        .execute(&workflow, TriggerMode::Manual, json!({"v": 42}), CancellationHandle::new())
        .await
        .unwrap();

    assert_eq!(execution.status, ExecutionStatus::Success);
    assert_eq!(
        execution.execution_path,
        vec![key("start"), key("if"), key("set_true")]
    );

    let detail = eng_journal_detail(&eng, execution.id);
    let rows = detail.node_executions.unwrap();
    let set_false = rows.iter().find(|n| n.node_id == key("set_false")).unwrap();
    assert_eq!(set_false.status, NodeStatus::Skipped);
}

/// 3. Parallel fan-out with merge: Start -> A, Start -> B, A+B -> Merge{append}.
#[tokio::test]
async fn parallel_fan_out_merges_once() {
    let nodes = vec![
        Node::new("start", "start", "Start").unwrap(),
        Node::new("a", "noop", "A").unwrap(),
        Node::new("b", "noop", "B").unwrap(),
        Node::new("merge", "merge", "Merge").unwrap().with_parameter("mode", json!("append")),
    ];
    let connections = vec![
        Connection::main(key("start"), key("a")),
        Connection::main(key("start"), key("b")),
        Connection::main(key("a"), key("merge")),
        Connection::main(key("b"), key("merge")),
    ];
    let settings = Settings {
        execution_mode: ExecutionMode::Parallel,
        max_concurrency: 2,
        ..Settings::default()
    };
    let definition = WorkflowDefinition::new(nodes, connections).with_settings(settings);
    let workflow = Workflow::new("fan-out", Environment::Testing, definition);

    let eng = engine(registry());
    let execution = eng
        .execute(&workflow, TriggerMode::Manual, json!(["a-payload"]), CancellationHandle::new())
        .await
        .unwrap();

    assert_eq!(execution.status, ExecutionStatus::Success);

    let detail = eng_journal_detail(&eng, execution.id);
    let rows = detail.node_executions.unwrap();
    let order = |id: &str| rows.iter().find(|n| n.node_id == key(id)).unwrap().execution_order;
    assert!(order("a") < order("merge"));
    assert!(order("b") < order("merge"));

    let merge_row = rows.iter().find(|n| n.node_id == key("merge")).unwrap();
    assert_eq!(merge_row.output_data, Some(json!(["a-payload", "a-payload"])));
}

/// 4. Retry: a flaky node fails twice then succeeds, three attempt log lines.
struct FlakyExecutor {
    definition: NodeDefinition,
    failures_remaining: AtomicU32,
}

impl FlakyExecutor {
    fn new(failures_remaining: u32) -> Self {
        Self {
            definition: NodeDefinition::new(Key::from_str("flaky").unwrap(), "Flaky", "integration"),
            failures_remaining: AtomicU32::new(failures_remaining),
        }
    }
}

#[async_trait]
impl NodeExecutor for FlakyExecutor {
    fn definition(&self) -> &NodeDefinition {
        &self.definition
    }

    async fn execute(&self, _parameters: serde_json::Map<String, Value>, _context: &ExecutionContext) -> NodeResult {
        if self.failures_remaining.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)).is_ok() {
            NodeResult::error(NodeError::new(NodeErrorKind::External, "transient failure"))
        } else {
            NodeResult::success(json!({"ok": true}))
        }
    }
}

#[tokio::test]
async fn retry_then_succeed_records_retry_count_and_attempt_logs() {
    let mut registry = registry();
    registry.register(Arc::new(FlakyExecutor::new(2)));

    let retry = RetrySettings {
        max_retries: 3,
        base_delay: Duration::from_millis(100),
        max_delay: Duration::from_secs(60),
    };
    let nodes = vec![Node::new("flaky", "flaky", "Flaky").unwrap().with_retry(retry)];
    let definition = WorkflowDefinition::new(nodes, vec![]);
    let workflow = Workflow::new("retry", Environment::Testing, definition);

    let eng = engine(registry);
    let execution = eng
        .execute(&workflow, TriggerMode::Manual, Value::Null, CancellationHandle::new())
        .await
        .unwrap();

    assert_eq!(execution.status, ExecutionStatus::Success);

    let detail = eng_journal_detail(&eng, execution.id);
    let row = detail.node_executions.unwrap().into_iter().next().unwrap();
    assert_eq!(row.status, NodeStatus::Success);
    assert_eq!(row.retry_count, 2);

    let logs = eng.journal().logs_filtered(execution.id, LogLevel::Trace);
    let attempts: Vec<&str> = logs
        .iter()
        .filter_map(|l| {
            if l.message.starts_with("request-attempt-") {
                Some(l.message.as_str())
            } else {
                None
            }
        })
        .collect();
    assert_eq!(attempts, vec!["request-attempt-0", "request-attempt-1", "request-attempt-2"]);
}

/// 5. Cancellation mid-execution: Start -> NoOp{delay}. Canceled shortly after start;
/// the broadcast `ExecutionCompleted.status=Canceled` must be the last delivered event.
#[tokio::test]
async fn cancellation_mid_execution_ends_canceled_and_is_the_last_event() {
    let nodes = vec![
        Node::new("start", "start", "Start").unwrap(),
        Node::new("noop", "noop", "NoOp").unwrap().with_parameter("delay", json!(300)),
    ];
    let connections = vec![Connection::main(key("start"), key("noop"))];
    let definition = WorkflowDefinition::new(nodes, connections);
    let workflow = Workflow::new("cancel-me", Environment::Testing, definition);

    let events = Arc::new(EventBus::new(64));
    let journal = Arc::new(Journal::new());
    let eng = Arc::new(Engine::new(Arc::new(registry()), journal.clone(), events.clone()));
    let cancel = CancellationHandle::new();

    let spawned_engine = eng.clone();
    let spawned_workflow = workflow.clone();
    let spawned_cancel = cancel.clone();
    let handle = tokio::spawn(async move {
        spawned_engine
            .execute(&spawned_workflow, TriggerMode::Manual, Value::Null, spawned_cancel)
            .await
            .unwrap()
    });

    // give `execute` time to insert the execution row before we look it up.
    tokio::time::sleep(Duration::from_millis(20)).await;
    let execution_id = journal
        .list(&ExecutionFilter::default(), Page { offset: 0, limit: 10 })
        .items
        .into_iter()
        .find(|e| e.workflow_id == workflow.id)
        .expect("execution row inserted synchronously at the top of execute()")
        .id;
    let (mut rx, _drops) = events.subscribe(execution_id);

    tokio::time::sleep(Duration::from_millis(20)).await;
    cancel.cancel();

    let execution = handle.await.unwrap();
    assert_eq!(execution.status, ExecutionStatus::Canceled);

    let mut last = None;
    while let Some(event) = rx.recv().await {
        last = Some(event);
    }
    match last {
        Some(ExecutionEvent::ExecutionCompleted { status, .. }) => assert_eq!(status, ExecutionStatus::Canceled),
        other => panic!("expected ExecutionCompleted as the last event, got {other:?}"),
    }
}

/// 6. Switch fallback: no case matches, `fallbackOutput` fires; the engine
/// records `isFallback=true` metadata on the log line.
#[tokio::test]
async fn switch_fallback_fires_and_is_flagged() {
    let nodes = vec![
        Node::new("start", "start", "Start").unwrap(),
        Node::new("switch", "switch", "Switch")
            .unwrap()
            .with_parameter("value", json!("{{ $json.status }}"))
            .with_parameter("cases", json!([{"value": "a", "outputIndex": 0}, {"value": "b", "outputIndex": 1}]))
            .with_parameter("fallbackOutput", json!(2)),
        Node::new("landed", "noop", "Landed").unwrap(),
    ];
    let connections = vec![
        Connection::main(key("start"), key("switch")),
        Connection::new(key("switch"), "2", key("landed"), "main"),
    ];
    let definition = WorkflowDefinition::new(nodes, connections);
    let workflow = Workflow::new("switch-fallback", Environment::Testing, definition);

    let eng = engine(registry());
    let execution = eng
        .execute(&workflow, TriggerMode::Manual, json!({"status": "z"}), CancellationHandle::new())
        .await
        .unwrap();

    assert_eq!(execution.status, ExecutionStatus::Success);
    assert_eq!(execution.execution_path, vec![key("start"), key("switch"), key("landed")]);

    let logs = eng.journal().logs_filtered(execution.id, LogLevel::Trace);
    assert!(logs.iter().any(|l| l.metadata.get("isFallback") == Some(&Value::Bool(true))));
}

fn eng_journal_detail(eng: &Engine, execution_id: flowcore_core::ExecutionId) -> flowcore_journal::ExecutionDetail {
    eng.journal().get(execution_id, true, true).expect("execution row exists")
}
