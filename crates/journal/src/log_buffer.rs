//! Batched log writes (spec §4.5: "logs buffered and flushed in time- or
//! size-bounded groups").

use parking_lot::Mutex;
use std::time::{Duration, Instant};

use crate::types::ExecutionLog;

#[derive(Debug, Clone, Copy)]
pub struct LogBufferConfig {
    pub max_batch_size: usize,
    pub max_batch_age: Duration,
}

impl Default for LogBufferConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 100,
            max_batch_age: Duration::from_millis(500),
        }
    }
}

struct Inner {
    pending: Vec<ExecutionLog>,
    opened_at: Instant,
}

/// Accumulates log rows in memory and reports when the batch is due for a
/// flush, either because it hit `max_batch_size` or `max_batch_age` elapsed
/// since the first unflushed row.
pub struct LogBuffer {
    config: LogBufferConfig,
    inner: Mutex<Inner>,
}

impl LogBuffer {
    pub fn new(config: LogBufferConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                pending: Vec::new(),
                opened_at: Instant::now(),
            }),
        }
    }

    /// Appends a row and returns `true` if the batch is now due for a flush.
    pub fn push(&self, log: ExecutionLog) -> bool {
        let mut inner = self.inner.lock();
        if inner.pending.is_empty() {
            inner.opened_at = Instant::now();
        }
        inner.pending.push(log);
        inner.pending.len() >= self.config.max_batch_size || inner.opened_at.elapsed() >= self.config.max_batch_age
    }

    /// Drains and returns everything buffered, resetting the batch clock.
    pub fn drain(&self) -> Vec<ExecutionLog> {
        let mut inner = self.inner.lock();
        inner.opened_at = Instant::now();
        std::mem::take(&mut inner.pending)
    }

    #[must_use]
    pub fn is_due(&self) -> bool {
        let inner = self.inner.lock();
        !inner.pending.is_empty()
            && (inner.pending.len() >= self.config.max_batch_size || inner.opened_at.elapsed() >= self.config.max_batch_age)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(LogBufferConfig::default())
    }
}
