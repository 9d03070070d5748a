//! stdout rendering for the `run` command: a line per broadcast event as it
//! arrives, then the full journal row once the execution settles.

use flowcore_core::ExecutionId;
use flowcore_eventbus::ExecutionEvent;
use flowcore_journal::Journal;

pub fn print_event(event: &ExecutionEvent) {
    match event {
        ExecutionEvent::ExecutionStarted { execution_id, execution } => {
            println!("[{execution_id}] started (trigger: {:?})", execution.trigger_mode);
        }
        ExecutionEvent::ExecutionCompleted { execution_id, status } => {
            println!("[{execution_id}] finished: {status:?}");
        }
        other => println!("[{}] {other:?}", other.execution_id()),
    }
}

pub fn print_execution(journal: &Journal, execution_id: ExecutionId) {
    let Some(detail) = journal.get(execution_id, true, true) else {
        eprintln!("execution {execution_id} vanished from the journal");
        return;
    };

    let execution = &detail.execution;
    println!();
    println!("execution {execution_id}: {:?}", execution.status);
    println!(
        "  duration: {}ms  executed: {}  skipped: {}  failed: {}",
        execution.duration_ms.unwrap_or(0),
        execution.counters.executed,
        execution.counters.skipped,
        execution.counters.failed
    );
    if let Some(message) = &execution.error_message {
        println!("  error: {message}");
    }
    println!(
        "  path: {}",
        execution
            .execution_path
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" -> ")
    );

    if let Some(nodes) = &detail.node_executions {
        println!("  nodes:");
        for node in nodes {
            let output = node.output_data.as_ref().map_or_else(|| "-".to_string(), |v| v.to_string());
            println!(
                "    {:<20} {:<8} retries={} output={output}",
                node.node_name,
                format!("{:?}", node.status),
                node.retry_count
            );
            if let Some(error) = &node.error_message {
                println!("      error: {error}");
            }
        }
    }
}
