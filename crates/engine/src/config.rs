//! Engine configuration, read from the process environment (spec §6).

use std::time::Duration;

fn env_usize(name: &str, default: usize) -> usize {
    std::env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_secs(name: &str, default: Duration) -> Duration {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

fn env_days(name: &str, default: i64) -> chrono::Duration {
    let days = std::env::var(name).ok().and_then(|v| v.parse::<i64>().ok()).unwrap_or(default);
    chrono::Duration::days(days)
}

/// Process-wide engine tuning, overridable via `FLOWCORE_*` environment
/// variables (spec §6). All fields have a documented default so a bare
/// `EngineConfig::default()` is a reasonable production starting point.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on workflow executions running concurrently across the
    /// whole process. `FLOWCORE_MAX_CONCURRENT_EXECUTIONS`, default 100.
    pub max_concurrent_executions: usize,
    /// Applied to a workflow execution when its own `Settings.execution_timeout`
    /// is unset. `FLOWCORE_DEFAULT_EXECUTION_TIMEOUT_SECS`, default 300s.
    pub default_execution_timeout: Duration,
    /// Applied to a node invocation when its own `Node.timeout` is unset.
    /// `FLOWCORE_DEFAULT_NODE_TIMEOUT_SECS`, default 60s.
    pub default_node_timeout: Duration,
    /// How long a finished `WorkflowExecution` row is kept before
    /// `Journal::purge_older_than` drops it. `FLOWCORE_LOG_RETENTION_DAYS`,
    /// default 30 days.
    pub log_retention: chrono::Duration,
    /// Outer guard around a node's parameter-template resolution, on top of
    /// the expression evaluator's own internal wall-clock bound.
    /// `FLOWCORE_EXPRESSION_TIMEOUT_SECS`, default 5s.
    pub expression_timeout: Duration,
    /// Grace period given to in-flight nodes to observe cancellation before
    /// the engine force-finalizes them (spec §5). Not currently exposed as
    /// an env var — 5s matches the spec's stated grace window exactly.
    pub cancellation_grace: Duration,
}

impl EngineConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            max_concurrent_executions: env_usize("FLOWCORE_MAX_CONCURRENT_EXECUTIONS", 100),
            default_execution_timeout: env_secs("FLOWCORE_DEFAULT_EXECUTION_TIMEOUT_SECS", Duration::from_secs(300)),
            default_node_timeout: env_secs("FLOWCORE_DEFAULT_NODE_TIMEOUT_SECS", Duration::from_secs(60)),
            log_retention: env_days("FLOWCORE_LOG_RETENTION_DAYS", 30),
            expression_timeout: env_secs("FLOWCORE_EXPRESSION_TIMEOUT_SECS", Duration::from_secs(5)),
            cancellation_grace: Duration::from_secs(5),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_unset() {
        std::env::remove_var("FLOWCORE_MAX_CONCURRENT_EXECUTIONS");
        let config = EngineConfig::from_env();
        assert_eq!(config.max_concurrent_executions, 100);
        assert_eq!(config.default_execution_timeout, Duration::from_secs(300));
        assert_eq!(config.log_retention, chrono::Duration::days(30));
    }

    #[test]
    fn reads_override_from_env() {
        std::env::set_var("FLOWCORE_MAX_CONCURRENT_EXECUTIONS", "7");
        let config = EngineConfig::from_env();
        assert_eq!(config.max_concurrent_executions, 7);
        std::env::remove_var("FLOWCORE_MAX_CONCURRENT_EXECUTIONS");
    }
}
