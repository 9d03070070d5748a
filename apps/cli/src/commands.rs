use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde_json::Value;

use flowcore_engine::Engine;
use flowcore_eventbus::EventBus;
use flowcore_graph::ExecutionGraph;
use flowcore_journal::{ExecutionStatus, Journal, TriggerMode};
use flowcore_node::{CancellationHandle, NodeRegistry};
use flowcore_workflow::Workflow;

use crate::report;

#[derive(Clone, Copy, ValueEnum)]
pub enum TriggerModeArg {
    Manual,
    Webhook,
    Schedule,
}

impl From<TriggerModeArg> for TriggerMode {
    fn from(value: TriggerModeArg) -> Self {
        match value {
            TriggerModeArg::Manual => TriggerMode::Manual,
            TriggerModeArg::Webhook => TriggerMode::Webhook,
            TriggerModeArg::Schedule => TriggerMode::Schedule,
        }
    }
}

fn load_workflow(path: &Path) -> Result<Workflow> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing workflow definition from {}", path.display()))
}

fn load_trigger_payload(path: Option<&Path>) -> Result<Value> {
    let Some(path) = path else {
        return Ok(Value::Null);
    };
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing trigger payload from {}", path.display()))
}

fn builtin_registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    flowcore_nodes::register_builtin(&mut registry);
    registry
}

pub async fn run(path: &Path, trigger: Option<&Path>, mode: TriggerModeArg) -> Result<()> {
    let workflow = load_workflow(path)?;
    let trigger_payload = load_trigger_payload(trigger)?;

    let journal = Arc::new(Journal::new());
    let events = Arc::new(EventBus::new(256));
    let engine = Engine::new(Arc::new(builtin_registry()), journal.clone(), events.clone());

    let mut global_events = events.subscribe_global();
    let printer = tokio::spawn(async move {
        while let Ok(event) = global_events.recv().await {
            report::print_event(&event);
        }
    });

    let execution = engine
        .execute(&workflow, mode.into(), trigger_payload, CancellationHandle::new())
        .await
        .map_err(|err| anyhow::anyhow!(err))?;

    printer.abort();
    report::print_execution(&journal, execution.id);

    if execution.status != ExecutionStatus::Success {
        std::process::exit(1);
    }
    Ok(())
}

pub fn validate(path: &Path) -> Result<()> {
    let workflow = load_workflow(path)?;
    let graph = ExecutionGraph::build(&workflow.definition).map_err(|err| anyhow::anyhow!(err))?;

    let registry = builtin_registry();
    for node in &workflow.definition.nodes {
        if !registry.contains(&node.kind_key) {
            anyhow::bail!("node '{}' references unknown kind '{}'", node.id, node.kind_key);
        }
    }

    println!(
        "workflow '{}' is valid: {} node(s), {} root(s)",
        workflow.name,
        graph.len(),
        graph.roots().len()
    );
    Ok(())
}
