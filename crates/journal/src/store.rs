//! In-memory journal store (spec §4.5). Behind a `parking_lot::RwLock` per
//! table, matching the shape a real persistence-backed implementation
//! would expose so the engine never depends on storage details.

use std::collections::HashMap;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use flowcore_core::{ExecutionId, WorkflowId};
use parking_lot::RwLock;

use crate::error::{JournalError, JournalResult};
use crate::log_buffer::{LogBuffer, LogBufferConfig};
use crate::query::{ExecutionFilter, Page, PagedResult};
use crate::stats::ExecutionStats;
use crate::types::{ExecutionLog, ExecutionStatus, LogLevel, NodeExecution, WorkflowExecution};

#[derive(Debug, Clone)]
pub struct ExecutionDetail {
    pub execution: WorkflowExecution,
    pub node_executions: Option<Vec<NodeExecution>>,
    pub logs: Option<Vec<ExecutionLog>>,
}

struct Tables {
    executions: HashMap<ExecutionId, WorkflowExecution>,
    node_executions: HashMap<ExecutionId, Vec<NodeExecution>>,
    logs: HashMap<ExecutionId, Vec<ExecutionLog>>,
}

/// Durable recording of `WorkflowExecution`, `NodeExecution`, and
/// `ExecutionLog` rows, plus the read queries the engine and operator
/// tooling need. Log writes go through a [`LogBuffer`] first; call
/// [`Journal::flush_logs`] on the configured cadence (a timer task in
/// production, directly in tests).
pub struct Journal {
    tables: RwLock<Tables>,
    log_buffer: LogBuffer,
    log_sequence: std::sync::atomic::AtomicU64,
}

impl Journal {
    pub fn new() -> Self {
        Self::with_log_buffer_config(LogBufferConfig::default())
    }

    pub fn with_log_buffer_config(config: LogBufferConfig) -> Self {
        Self {
            tables: RwLock::new(Tables {
                executions: HashMap::new(),
                node_executions: HashMap::new(),
                logs: HashMap::new(),
            }),
            log_buffer: LogBuffer::new(config),
            log_sequence: std::sync::atomic::AtomicU64::new(0),
        }
    }

    pub fn insert_execution(&self, execution: WorkflowExecution) {
        self.tables.write().executions.insert(execution.id, execution);
    }

    /// Updates an existing `WorkflowExecution` row in place via `mutate`.
    pub fn update_execution<F: FnOnce(&mut WorkflowExecution)>(&self, id: ExecutionId, mutate: F) -> JournalResult<()> {
        let mut tables = self.tables.write();
        let execution = tables.executions.get_mut(&id).ok_or(JournalError::ExecutionNotFound(id))?;
        mutate(execution);
        Ok(())
    }

    /// Inserts a new `NodeExecution` row, or updates the existing one for
    /// this `(execution_id, node_id)` — retries reuse the row (spec §4.4
    /// step 6: "Retries reuse the same NodeExecution row").
    pub fn upsert_node_execution(&self, node_execution: NodeExecution) {
        let mut tables = self.tables.write();
        let rows = tables.node_executions.entry(node_execution.execution_id).or_default();
        if let Some(existing) = rows.iter_mut().find(|n| n.node_id == node_execution.node_id) {
            *existing = node_execution;
        } else {
            rows.push(node_execution);
        }
    }

    /// Buffers a log row; returns `true` if the batch is now due for
    /// [`Self::flush_logs`].
    pub fn append_log(&self, mut log: ExecutionLog) -> bool {
        log.insertion_sequence = self.log_sequence.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.log_buffer.push(log)
    }

    /// Drains the pending log batch into durable storage, sorted by
    /// `(timestamp, insertion_sequence)` (spec §3 total-order invariant).
    pub fn flush_logs(&self) {
        let mut drained = self.log_buffer.drain();
        if drained.is_empty() {
            return;
        }
        drained.sort_by_key(|l| (l.timestamp, l.insertion_sequence));
        let mut tables = self.tables.write();
        for log in drained {
            tables.logs.entry(log.execution_id).or_default().push(log);
        }
    }

    #[must_use]
    pub fn logs_pending_flush(&self) -> bool {
        self.log_buffer.is_due()
    }

    #[must_use]
    pub fn get(&self, id: ExecutionId, include_nodes: bool, include_logs: bool) -> Option<ExecutionDetail> {
        let tables = self.tables.read();
        let execution = tables.executions.get(&id)?.clone();
        let node_executions = include_nodes.then(|| tables.node_executions.get(&id).cloned().unwrap_or_default());
        let logs = include_logs.then(|| tables.logs.get(&id).cloned().unwrap_or_default());
        Some(ExecutionDetail {
            execution,
            node_executions,
            logs,
        })
    }

    #[must_use]
    pub fn list(&self, filter: &ExecutionFilter, page: Page) -> PagedResult<WorkflowExecution> {
        let tables = self.tables.read();
        let mut matching: Vec<WorkflowExecution> = tables
            .executions
            .values()
            .filter(|e| filter.workflow_id.is_none_or_eq(e.workflow_id))
            .filter(|e| filter.status.is_none_or_eq(e.status))
            .filter(|e| filter.environment.is_none_or_eq(e.environment))
            .filter(|e| filter.started_after.map_or(true, |after| e.started_at >= after))
            .filter(|e| filter.started_before.map_or(true, |before| e.started_at <= before))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        let total = matching.len();
        let items: Vec<_> = matching.into_iter().skip(page.offset).take(page.limit).collect();
        let has_more = page.offset + items.len() < total;
        PagedResult { items, total, has_more }
    }

    #[must_use]
    pub fn recent_by_workflow(&self, workflow_id: WorkflowId, limit: usize) -> Vec<WorkflowExecution> {
        self.list(&ExecutionFilter::default().with_workflow(workflow_id), Page::new(0, limit))
            .items
    }

    #[must_use]
    pub fn stats(&self, filter: &ExecutionFilter) -> ExecutionStats {
        let matching = self.list(filter, Page::new(0, usize::MAX));
        ExecutionStats::compute(&matching.items)
    }

    #[must_use]
    pub fn logs_filtered(&self, execution_id: ExecutionId, min_level: LogLevel) -> Vec<ExecutionLog> {
        let tables = self.tables.read();
        tables
            .logs
            .get(&execution_id)
            .map(|rows| rows.iter().filter(|l| l.level >= min_level).cloned().collect())
            .unwrap_or_default()
    }

    /// Removes terminal executions (and their node executions / logs)
    /// finished more than `max_age` before `now` (spec §4.5: "retention
    /// purge by age").
    pub fn purge_older_than(&self, now: DateTime<Utc>, max_age: ChronoDuration) -> usize {
        let cutoff = now - max_age;
        let mut tables = self.tables.write();
        let expired: Vec<ExecutionId> = tables
            .executions
            .values()
            .filter(|e| e.status.is_terminal() && e.finished_at.is_some_and(|f| f < cutoff))
            .map(|e| e.id)
            .collect();
        for id in &expired {
            tables.executions.remove(id);
            tables.node_executions.remove(id);
            tables.logs.remove(id);
        }
        expired.len()
    }
}

impl Default for Journal {
    fn default() -> Self {
        Self::new()
    }
}

/// Small helper to keep `list`'s filter chain readable: `None` passes,
/// `Some(x)` requires equality.
trait OptionEqExt<T> {
    fn is_none_or_eq(&self, value: T) -> bool;
}

impl<T: PartialEq> OptionEqExt<T> for Option<T> {
    fn is_none_or_eq(&self, value: T) -> bool {
        match self {
            None => true,
            Some(expected) => *expected == value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ExecutionCounters, NodeStatus, TriggerMode};
    use flowcore_core::{Environment, Key};

    fn sample_execution(workflow_id: WorkflowId, started_at: DateTime<Utc>) -> WorkflowExecution {
        WorkflowExecution::new(
            workflow_id,
            Environment::Testing,
            TriggerMode::Manual,
            serde_json::Value::Null,
            started_at,
        )
    }

    #[test]
    fn insert_and_get_roundtrips() {
        let journal = Journal::new();
        let exec = sample_execution(WorkflowId::v4(), Utc::now());
        let id = exec.id;
        journal.insert_execution(exec);
        let detail = journal.get(id, false, false).unwrap();
        assert_eq!(detail.execution.id, id);
        assert!(detail.node_executions.is_none());
    }

    #[test]
    fn get_missing_returns_none() {
        let journal = Journal::new();
        assert!(journal.get(ExecutionId::v4(), false, false).is_none());
    }

    #[test]
    fn update_execution_mutates_in_place() {
        let journal = Journal::new();
        let exec = sample_execution(WorkflowId::v4(), Utc::now());
        let id = exec.id;
        journal.insert_execution(exec);
        journal
            .update_execution(id, |e| e.finish(ExecutionStatus::Success, Utc::now(), None))
            .unwrap();
        assert_eq!(journal.get(id, false, false).unwrap().execution.status, ExecutionStatus::Success);
    }

    #[test]
    fn update_missing_execution_errors() {
        let journal = Journal::new();
        let result = journal.update_execution(ExecutionId::v4(), |_| {});
        assert!(result.is_err());
    }

    #[test]
    fn upsert_node_execution_inserts_then_replaces() {
        let journal = Journal::new();
        let execution_id = ExecutionId::v4();
        let node_id = Key::new("a").unwrap();
        let mut node_exec = NodeExecution::new(execution_id, node_id.clone(), "A", serde_json::Value::Null, Utc::now(), 0);
        journal.upsert_node_execution(node_exec.clone());
        node_exec.retry_count = 1;
        node_exec.status = NodeStatus::Running;
        journal.upsert_node_execution(node_exec);

        let detail = journal.get(execution_id, true, false).unwrap();
        let rows = detail.node_executions.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].retry_count, 1);
    }

    #[test]
    fn list_filters_by_workflow_and_status() {
        let journal = Journal::new();
        let workflow_a = WorkflowId::v4();
        let workflow_b = WorkflowId::v4();
        let mut exec_a = sample_execution(workflow_a, Utc::now());
        exec_a.finish(ExecutionStatus::Success, Utc::now(), None);
        let exec_b = sample_execution(workflow_b, Utc::now());
        journal.insert_execution(exec_a);
        journal.insert_execution(exec_b);

        let result = journal.list(&ExecutionFilter::default().with_workflow(workflow_a), Page::default());
        assert_eq!(result.total, 1);
        assert_eq!(result.items[0].workflow_id, workflow_a);

        let result = journal.list(&ExecutionFilter::default().with_status(ExecutionStatus::Running), Page::default());
        assert_eq!(result.total, 1);
    }

    #[test]
    fn list_paginates_and_orders_newest_first() {
        let journal = Journal::new();
        let workflow_id = WorkflowId::v4();
        let base = Utc::now();
        for i in 0..5 {
            journal.insert_execution(sample_execution(workflow_id, base + ChronoDuration::seconds(i)));
        }
        let page1 = journal.list(&ExecutionFilter::default(), Page::new(0, 2));
        assert_eq!(page1.items.len(), 2);
        assert!(page1.has_more);
        assert!(page1.items[0].started_at > page1.items[1].started_at);

        let page3 = journal.list(&ExecutionFilter::default(), Page::new(4, 2));
        assert_eq!(page3.items.len(), 1);
        assert!(!page3.has_more);
    }

    #[test]
    fn recent_by_workflow_limits_results() {
        let journal = Journal::new();
        let workflow_id = WorkflowId::v4();
        for _ in 0..3 {
            journal.insert_execution(sample_execution(workflow_id, Utc::now()));
        }
        assert_eq!(journal.recent_by_workflow(workflow_id, 2).len(), 2);
    }

    #[test]
    fn append_log_buffers_until_flush() {
        let journal = Journal::with_log_buffer_config(LogBufferConfig {
            max_batch_size: 1000,
            max_batch_age: std::time::Duration::from_secs(60),
        });
        let execution_id = ExecutionId::v4();
        journal.append_log(ExecutionLog::new(execution_id, Utc::now(), LogLevel::Info, "hi", 0));
        assert!(journal.logs_filtered(execution_id, LogLevel::Trace).is_empty());
        journal.flush_logs();
        assert_eq!(journal.logs_filtered(execution_id, LogLevel::Trace).len(), 1);
    }

    #[test]
    fn logs_filtered_respects_minimum_level() {
        let journal = Journal::new();
        let execution_id = ExecutionId::v4();
        journal.append_log(ExecutionLog::new(execution_id, Utc::now(), LogLevel::Debug, "d", 0));
        journal.append_log(ExecutionLog::new(execution_id, Utc::now(), LogLevel::Error, "e", 1));
        journal.flush_logs();
        assert_eq!(journal.logs_filtered(execution_id, LogLevel::Warn).len(), 1);
        assert_eq!(journal.logs_filtered(execution_id, LogLevel::Trace).len(), 2);
    }

    #[test]
    fn purge_removes_only_terminal_expired_executions() {
        let journal = Journal::new();
        let now = Utc::now();

        let mut old_done = sample_execution(WorkflowId::v4(), now - ChronoDuration::days(40));
        old_done.finish(ExecutionStatus::Success, now - ChronoDuration::days(40), None);
        let old_done_id = old_done.id;

        let recent_done = {
            let mut e = sample_execution(WorkflowId::v4(), now - ChronoDuration::hours(1));
            e.finish(ExecutionStatus::Success, now - ChronoDuration::hours(1), None);
            e
        };
        let recent_id = recent_done.id;

        let still_running = sample_execution(WorkflowId::v4(), now - ChronoDuration::days(40));
        let running_id = still_running.id;

        journal.insert_execution(old_done);
        journal.insert_execution(recent_done);
        journal.insert_execution(still_running);

        let purged = journal.purge_older_than(now, ChronoDuration::days(30));
        assert_eq!(purged, 1);
        assert!(journal.get(old_done_id, false, false).is_none());
        assert!(journal.get(recent_id, false, false).is_some());
        assert!(journal.get(running_id, false, false).is_some());
    }

    #[test]
    fn counters_default_to_zero() {
        let counters = ExecutionCounters::default();
        assert_eq!(counters.executed, 0);
        assert_eq!(counters.failed, 0);
    }
}
