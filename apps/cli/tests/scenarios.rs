//! Drives the CLI binary end to end against the literal scenarios from
//! the execution core's testable-properties section: a linear chain, a
//! pruned conditional branch, and a parallel fan-out into a merge.
//! Retry and cancellation are exercised at the scheduler level in
//! `flowcore-engine`'s own scenario tests; this file covers what the
//! demo binary itself is responsible for rendering to stdout.

use std::io::Write;

use assert_cmd::Command;
use predicates::str::contains;
use tempfile::NamedTempFile;

fn workflow_file(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp workflow file");
    file.write_all(json.as_bytes()).expect("write workflow json");
    file
}

fn cli() -> Command {
    Command::cargo_bin("flowcore").expect("locate flowcore binary")
}

const LINEAR_WORKFLOW: &str = r#"{
  "id": "00000000-0000-0000-0000-000000000001",
  "name": "linear",
  "description": null,
  "active": true,
  "environment": "testing",
  "version": 1,
  "creator": "",
  "parent_workflow_id": null,
  "created_at": "2026-01-01T00:00:00Z",
  "definition": {
    "nodes": [
      { "id": "start", "kind_key": "start", "display_name": "Start", "parameters": {}, "credentials": {}, "position": [0.0, 0.0], "retry_settings": null, "timeout": null, "enabled": true },
      { "id": "set", "kind_key": "set", "display_name": "Set", "parameters": { "values": [ { "name": "x", "value": "{{ 1 + 2 }}" } ] }, "credentials": {}, "position": [0.0, 0.0], "retry_settings": null, "timeout": null, "enabled": true },
      { "id": "noop", "kind_key": "noop", "display_name": "NoOp", "parameters": {}, "credentials": {}, "position": [0.0, 0.0], "retry_settings": null, "timeout": null, "enabled": true }
    ],
    "connections": [
      { "source_node_id": "start", "source_output": "main", "target_node_id": "set", "target_input": "main" },
      { "source_node_id": "set", "source_output": "main", "target_node_id": "noop", "target_input": "main" }
    ],
    "variables": {},
    "settings": { "execution_mode": "sequential", "max_concurrency": 5, "execution_timeout": null, "timezone": null, "error_handler_workflow_id": null }
  }
}"#;

const CONDITIONAL_WORKFLOW: &str = r#"{
  "id": "00000000-0000-0000-0000-000000000002",
  "name": "conditional",
  "description": null,
  "active": true,
  "environment": "testing",
  "version": 1,
  "creator": "",
  "parent_workflow_id": null,
  "created_at": "2026-01-01T00:00:00Z",
  "definition": {
    "nodes": [
      { "id": "start", "kind_key": "start", "display_name": "Start", "parameters": {}, "credentials": {}, "position": [0.0, 0.0], "retry_settings": null, "timeout": null, "enabled": true },
      { "id": "branch", "kind_key": "if", "display_name": "If", "parameters": { "condition": "{{ $node.Start.data.v > 10 }}" }, "credentials": {}, "position": [0.0, 0.0], "retry_settings": null, "timeout": null, "enabled": true },
      { "id": "set_true", "kind_key": "set", "display_name": "SetTrue", "parameters": { "values": [ { "name": "r", "value": "hi" } ] }, "credentials": {}, "position": [0.0, 0.0], "retry_settings": null, "timeout": null, "enabled": true },
      { "id": "set_false", "kind_key": "set", "display_name": "SetFalse", "parameters": { "values": [ { "name": "r", "value": "lo" } ] }, "credentials": {}, "position": [0.0, 0.0], "retry_settings": null, "timeout": null, "enabled": true }
    ],
    "connections": [
      { "source_node_id": "start", "source_output": "main", "target_node_id": "branch", "target_input": "main" },
      { "source_node_id": "branch", "source_output": "true", "target_node_id": "set_true", "target_input": "main" },
      { "source_node_id": "branch", "source_output": "false", "target_node_id": "set_false", "target_input": "main" }
    ],
    "variables": {},
    "settings": { "execution_mode": "sequential", "max_concurrency": 5, "execution_timeout": null, "timezone": null, "error_handler_workflow_id": null }
  }
}"#;

const PARALLEL_MERGE_WORKFLOW: &str = r#"{
  "id": "00000000-0000-0000-0000-000000000003",
  "name": "parallel-merge",
  "description": null,
  "active": true,
  "environment": "testing",
  "version": 1,
  "creator": "",
  "parent_workflow_id": null,
  "created_at": "2026-01-01T00:00:00Z",
  "definition": {
    "nodes": [
      { "id": "start", "kind_key": "start", "display_name": "Start", "parameters": {}, "credentials": {}, "position": [0.0, 0.0], "retry_settings": null, "timeout": null, "enabled": true },
      { "id": "a", "kind_key": "noop", "display_name": "A", "parameters": {}, "credentials": {}, "position": [0.0, 0.0], "retry_settings": null, "timeout": null, "enabled": true },
      { "id": "b", "kind_key": "noop", "display_name": "B", "parameters": {}, "credentials": {}, "position": [0.0, 0.0], "retry_settings": null, "timeout": null, "enabled": true },
      { "id": "merge", "kind_key": "merge", "display_name": "Merge", "parameters": { "mode": "append" }, "credentials": {}, "position": [0.0, 0.0], "retry_settings": null, "timeout": null, "enabled": true }
    ],
    "connections": [
      { "source_node_id": "start", "source_output": "main", "target_node_id": "a", "target_input": "main" },
      { "source_node_id": "start", "source_output": "main", "target_node_id": "b", "target_input": "main" },
      { "source_node_id": "a", "source_output": "main", "target_node_id": "merge", "target_input": "main" },
      { "source_node_id": "b", "source_output": "main", "target_node_id": "merge", "target_input": "main" }
    ],
    "variables": {},
    "settings": { "execution_mode": "parallel", "max_concurrency": 2, "execution_timeout": null, "timezone": null, "error_handler_workflow_id": null }
  }
}"#;

const SWITCH_FALLBACK_WORKFLOW: &str = r#"{
  "id": "00000000-0000-0000-0000-000000000004",
  "name": "switch-fallback",
  "description": null,
  "active": true,
  "environment": "testing",
  "version": 1,
  "creator": "",
  "parent_workflow_id": null,
  "created_at": "2026-01-01T00:00:00Z",
  "definition": {
    "nodes": [
      { "id": "start", "kind_key": "start", "display_name": "Start", "parameters": {}, "credentials": {}, "position": [0.0, 0.0], "retry_settings": null, "timeout": null, "enabled": true },
      { "id": "switch", "kind_key": "switch", "display_name": "Switch", "parameters": { "value": "{{ $json.status }}", "cases": [ { "value": "a", "outputIndex": 0 }, { "value": "b", "outputIndex": 1 } ], "fallbackOutput": 2 }, "credentials": {}, "position": [0.0, 0.0], "retry_settings": null, "timeout": null, "enabled": true },
      { "id": "landed", "kind_key": "noop", "display_name": "Landed", "parameters": {}, "credentials": {}, "position": [0.0, 0.0], "retry_settings": null, "timeout": null, "enabled": true }
    ],
    "connections": [
      { "source_node_id": "start", "source_output": "main", "target_node_id": "switch", "target_input": "main" },
      { "source_node_id": "switch", "source_output": "2", "target_node_id": "landed", "target_input": "main" }
    ],
    "variables": {},
    "settings": { "execution_mode": "sequential", "max_concurrency": 5, "execution_timeout": null, "timezone": null, "error_handler_workflow_id": null }
  }
}"#;

#[test]
fn validate_accepts_a_well_formed_workflow() {
    let file = workflow_file(LINEAR_WORKFLOW);
    cli()
        .arg("validate")
        .arg(file.path())
        .assert()
        .success()
        .stdout(contains("3 node(s), 1 root(s)"));
}

#[test]
fn validate_rejects_an_unknown_node_kind() {
    let json = LINEAR_WORKFLOW.replace("\"kind_key\": \"noop\"", "\"kind_key\": \"not_a_real_kind\"");
    let file = workflow_file(&json);
    cli().arg("validate").arg(file.path()).assert().failure();
}

#[test]
fn run_linear_chain_succeeds() {
    let file = workflow_file(LINEAR_WORKFLOW);
    cli()
        .arg("run")
        .arg(file.path())
        .assert()
        .success()
        .stdout(contains("execution"))
        .stdout(contains("Success"))
        .stdout(contains("start -> set -> noop"));
}

#[test]
fn run_conditional_prunes_the_false_branch() {
    let file = workflow_file(CONDITIONAL_WORKFLOW);
    let trigger = workflow_file(r#"{"v": 42}"#);
    cli()
        .arg("run")
        .arg(file.path())
        .arg("--trigger")
        .arg(trigger.path())
        .assert()
        .success()
        .stdout(contains("start -> branch -> set_true"))
        .stdout(contains("Skipped"));
}

#[test]
fn run_parallel_fan_out_merges_once() {
    let file = workflow_file(PARALLEL_MERGE_WORKFLOW);
    cli()
        .arg("run")
        .arg(file.path())
        .assert()
        .success()
        .stdout(contains("Success"))
        .stdout(contains("Merge"));
}

#[test]
fn run_switch_fallback_flags_the_fallback_branch() {
    let file = workflow_file(SWITCH_FALLBACK_WORKFLOW);
    let trigger = workflow_file(r#"{"status": "z"}"#);
    cli()
        .arg("run")
        .arg(file.path())
        .arg("--trigger")
        .arg(trigger.path())
        .assert()
        .success()
        .stdout(contains("start -> switch -> landed"));
}
