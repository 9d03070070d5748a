//! Clock capability — threaded through the engine so tests can control time.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};

/// Source of the current time. The production implementation is
/// [`SystemClock`]; tests use [`FixedClock`] or [`SteppingClock`] to get
/// deterministic timestamps and durations.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// The current UTC time.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time via [`chrono::Utc::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to a single instant, for snapshot-style tests.
#[derive(Debug, Clone)]
pub struct FixedClock(DateTime<Utc>);

impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self(at)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// A clock that advances by a fixed step on every call — useful for tests
/// that assert strict ordering of timestamps (e.g. insertion-sequence ties
/// in the execution log) without sleeping real time.
#[derive(Debug)]
pub struct SteppingClock {
    base: DateTime<Utc>,
    step_millis: i64,
    ticks: AtomicI64,
}

impl SteppingClock {
    pub fn new(base: DateTime<Utc>, step_millis: i64) -> Self {
        Self {
            base,
            step_millis,
            ticks: AtomicI64::new(0),
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
        self.base + chrono::Duration::milliseconds(tick * self.step_millis)
    }
}
