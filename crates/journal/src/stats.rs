//! Aggregate execution statistics (spec §4.5: "aggregate stats").

use std::collections::HashMap;

use crate::types::{ExecutionStatus, WorkflowExecution};

#[derive(Debug, Clone, Default)]
pub struct ExecutionStats {
    pub total: usize,
    pub by_status: HashMap<ExecutionStatus, usize>,
    pub average_duration_ms: Option<f64>,
}

impl ExecutionStats {
    #[must_use]
    pub fn compute(executions: &[WorkflowExecution]) -> Self {
        let mut by_status: HashMap<ExecutionStatus, usize> = HashMap::new();
        let mut durations = Vec::new();
        for execution in executions {
            *by_status.entry(execution.status).or_default() += 1;
            if let Some(ms) = execution.duration_ms {
                durations.push(ms as f64);
            }
        }
        let average_duration_ms = if durations.is_empty() {
            None
        } else {
            Some(durations.iter().sum::<f64>() / durations.len() as f64)
        };
        Self {
            total: executions.len(),
            by_status,
            average_duration_ms,
        }
    }
}
