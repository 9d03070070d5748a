//! A single node within a workflow definition (spec §3: "Node").

use std::collections::HashMap;
use std::time::Duration;

use flowcore_core::{Key, Value};
use serde::{Deserialize, Serialize};

/// Retry policy for a single node. Retries reuse the same `NodeExecution`
/// row, incrementing `retry_count` (spec §4.4 step 6).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetrySettings {
    pub max_retries: u32,
    #[serde(with = "duration_millis")]
    pub base_delay: Duration,
    #[serde(with = "duration_millis")]
    pub max_delay: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetrySettings {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Exponential backoff for the given 0-indexed attempt, capped at
    /// `max_delay` (spec §4.4: `base × 2^attempt`, cap 60s).
    #[must_use]
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        let scaled = self.base_delay.saturating_mul(factor);
        scaled.min(self.max_delay)
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        (d.as_millis() as u64).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(d)?;
        Ok(Duration::from_millis(millis))
    }
}

/// A node in a workflow graph. `id` and `kind_key` are both normalized
/// [`Key`]s: `id` is unique within the workflow, `kind_key` resolves
/// against the node runtime's registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: Key,
    pub kind_key: Key,
    pub display_name: String,
    #[serde(default)]
    pub parameters: HashMap<String, Value>,
    #[serde(default)]
    pub credentials: HashMap<String, String>,
    #[serde(default)]
    pub position: (f64, f64),
    pub retry_settings: Option<RetrySettings>,
    #[serde(default, with = "opt_duration_millis")]
    pub timeout: Option<Duration>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

mod opt_duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        d.map(|d| d.as_millis() as u64).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        let millis = Option::<u64>::deserialize(d)?;
        Ok(millis.map(Duration::from_millis))
    }
}

impl Node {
    pub fn new(id: &str, kind_key: &str, display_name: impl Into<String>) -> Result<Self, flowcore_core::KeyParseError> {
        Ok(Self {
            id: Key::new(id)?,
            kind_key: Key::new(kind_key)?,
            display_name: display_name.into(),
            parameters: HashMap::new(),
            credentials: HashMap::new(),
            position: (0.0, 0.0),
            retry_settings: None,
            timeout: None,
            enabled: true,
        })
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }

    pub fn with_retry(mut self, retry: RetrySettings) -> Self {
        self.retry_settings = Some(retry);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn retry_settings_or_default(&self) -> RetrySettings {
        self.retry_settings.unwrap_or_default()
    }
}
