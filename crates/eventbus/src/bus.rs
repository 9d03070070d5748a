//! The broadcast fan-out itself (spec §4.6).
//!
//! Per-execution channels live in a `dashmap::DashMap` so publish and
//! subscribe never contend on a single lock across unrelated executions.
//! Delivery is best-effort: a full or dropped receiver never blocks
//! `publish`, it only increments that execution's drop counter.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use flowcore_core::ExecutionId;
use tokio::sync::{broadcast, mpsc};

use crate::event::ExecutionEvent;

const DEFAULT_GLOBAL_CAPACITY: usize = 1024;

struct Subscription {
    sender: mpsc::Sender<ExecutionEvent>,
    dropped: Arc<AtomicU64>,
}

pub struct EventBus {
    per_execution: DashMap<ExecutionId, Subscription>,
    global: broadcast::Sender<ExecutionEvent>,
    buffer_size: usize,
}

impl EventBus {
    #[must_use]
    pub fn new(buffer_size: usize) -> Self {
        let (global, _) = broadcast::channel(DEFAULT_GLOBAL_CAPACITY);
        Self {
            per_execution: DashMap::new(),
            global,
            buffer_size,
        }
    }

    /// Subscribes to a single execution's events. Replaces any previous
    /// subscription for the same id (a reconnect), returning the drop
    /// count accumulated since the last subscribe so the caller can
    /// surface it (spec §4.6: "drop-counter reported on reconnection").
    pub fn subscribe(&self, execution_id: ExecutionId) -> (mpsc::Receiver<ExecutionEvent>, u64) {
        let (tx, rx) = mpsc::channel(self.buffer_size);
        let previous_drops = self
            .per_execution
            .get(&execution_id)
            .map_or(0, |s| s.dropped.load(Ordering::Relaxed));
        self.per_execution.insert(
            execution_id,
            Subscription {
                sender: tx,
                dropped: Arc::new(AtomicU64::new(0)),
            },
        );
        (rx, previous_drops)
    }

    #[must_use]
    pub fn subscribe_global(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.global.subscribe()
    }

    /// Publishes an event to its execution's subscriber (if any) and, for
    /// `ExecutionStarted`/`ExecutionCompleted`, to the global channel too.
    pub fn publish(&self, event: ExecutionEvent) {
        if event.is_global() {
            let _ = self.global.send(event.clone());
        }

        let execution_id = event.execution_id();
        if let Some(subscription) = self.per_execution.get(&execution_id) {
            if let Err(err) = subscription.sender.try_send(event) {
                subscription.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(execution_id = %execution_id, error = %err, "dropped broadcast event");
            }
        }
    }

    #[must_use]
    pub fn drop_count(&self, execution_id: ExecutionId) -> u64 {
        self.per_execution
            .get(&execution_id)
            .map_or(0, |s| s.dropped.load(Ordering::Relaxed))
    }

    /// Releases the channel for a finished execution; call after
    /// `ExecutionCompleted` has been delivered.
    pub fn remove(&self, execution_id: ExecutionId) {
        self.per_execution.remove(&execution_id);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowcore_core::Key;
    use flowcore_journal::NodeStatus;
    use std::str::FromStr;

    #[tokio::test]
    async fn subscriber_receives_events_in_fifo_order() {
        let bus = EventBus::new(8);
        let execution_id = ExecutionId::v4();
        let (mut rx, drops) = bus.subscribe(execution_id);
        assert_eq!(drops, 0);

        let node_id = Key::from_str("a").unwrap();
        bus.publish(ExecutionEvent::NodeExecutionStarted { execution_id, node_id: node_id.clone() });
        bus.publish(ExecutionEvent::NodeExecutionCompleted {
            execution_id,
            node_id,
            status: NodeStatus::Success,
        });

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert!(matches!(first, ExecutionEvent::NodeExecutionStarted { .. }));
        assert!(matches!(second, ExecutionEvent::NodeExecutionCompleted { .. }));
    }

    #[tokio::test]
    async fn unrelated_executions_do_not_cross_talk() {
        let bus = EventBus::new(8);
        let a = ExecutionId::v4();
        let b = ExecutionId::v4();
        let (mut rx_a, _) = bus.subscribe(a);
        let (mut rx_b, _) = bus.subscribe(b);

        bus.publish(ExecutionEvent::ExecutionCompleted { execution_id: a, status: flowcore_journal::ExecutionStatus::Success });

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn global_channel_only_receives_start_and_complete() {
        let bus = EventBus::new(8);
        let execution_id = ExecutionId::v4();
        let mut global_rx = bus.subscribe_global();
        let node_id = Key::from_str("a").unwrap();

        bus.publish(ExecutionEvent::NodeExecutionStarted { execution_id, node_id });
        bus.publish(ExecutionEvent::ExecutionCompleted { execution_id, status: flowcore_journal::ExecutionStatus::Success });

        let received = global_rx.try_recv().unwrap();
        assert!(matches!(received, ExecutionEvent::ExecutionCompleted { .. }));
        assert!(global_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn full_buffer_drops_and_counts_without_blocking() {
        let bus = EventBus::new(1);
        let execution_id = ExecutionId::v4();
        let (_rx, _) = bus.subscribe(execution_id);
        let node_id = Key::from_str("a").unwrap();

        for _ in 0..3 {
            bus.publish(ExecutionEvent::NodeExecutionStarted { execution_id, node_id: node_id.clone() });
        }

        assert!(bus.drop_count(execution_id) >= 1);
    }

    #[tokio::test]
    async fn resubscribe_reports_prior_drop_count() {
        let bus = EventBus::new(1);
        let execution_id = ExecutionId::v4();
        let (_rx, _) = bus.subscribe(execution_id);
        let node_id = Key::from_str("a").unwrap();
        for _ in 0..3 {
            bus.publish(ExecutionEvent::NodeExecutionStarted { execution_id, node_id: node_id.clone() });
        }
        let dropped_before = bus.drop_count(execution_id);
        assert!(dropped_before > 0);

        let (_rx2, reported) = bus.subscribe(execution_id);
        assert_eq!(reported, dropped_before);
        assert_eq!(bus.drop_count(execution_id), 0);
    }

    #[tokio::test]
    async fn remove_drops_subscription() {
        let bus = EventBus::new(8);
        let execution_id = ExecutionId::v4();
        let (_rx, _) = bus.subscribe(execution_id);
        bus.remove(execution_id);
        assert_eq!(bus.drop_count(execution_id), 0);
    }
}
