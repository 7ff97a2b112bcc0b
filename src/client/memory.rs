//! In-process queue client.
//!
//! Backs the dev `serve`/`submit` CLI path and the test suite. Notifications
//! and lifecycle events are fired from a spawned thread so consumers see the
//! same foreign-context delivery a real transport would give them.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use opentelemetry::KeyValue;
use tracing::debug;

use crate::error::Result;
use crate::model::WorkItem;
use crate::telemetry::metrics;

use super::{ClientEvent, EventCallback, NotifyCallback, QueueClient, QueueNotice};

#[derive(Default)]
struct Inner {
    queues: HashMap<String, VecDeque<WorkItem>>,
    notify: HashMap<String, Vec<NotifyCallback>>,
    events: Vec<EventCallback>,
    reported: Vec<(WorkItem, Option<Vec<String>>)>,
}

/// An in-process work-item queue with callback-based notification delivery.
#[derive(Default)]
pub struct MemoryQueue {
    inner: Mutex<Inner>,
    seq: AtomicU64,
}

impl MemoryQueue {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Enqueue an item and notify every callback registered for `queue`.
    ///
    /// Callbacks run on a detached thread — never on the caller's context and
    /// never on the consumer's runtime.
    pub fn push(&self, queue: &str, item: WorkItem) {
        let callbacks = {
            let mut inner = self.inner.lock().expect("memory queue poisoned");
            inner
                .queues
                .entry(queue.to_string())
                .or_default()
                .push_back(item);
            inner.notify.get(queue).cloned().unwrap_or_default()
        };

        metrics::queue_operations().add(
            1,
            &[
                KeyValue::new("queue", queue.to_string()),
                KeyValue::new("operation", "push"),
            ],
        );

        let notice = QueueNotice {
            queue: queue.to_string(),
        };
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        std::thread::spawn(move || {
            for cb in callbacks {
                cb(notice.clone(), seq);
            }
        });
    }

    /// Fire a lifecycle event at every subscriber, from a detached thread.
    pub fn raise_event(&self, event: ClientEvent) {
        let callbacks = {
            let inner = self.inner.lock().expect("memory queue poisoned");
            inner.events.clone()
        };
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        std::thread::spawn(move || {
            for cb in callbacks {
                cb(event.clone(), seq);
            }
        });
    }

    /// Items reported back so far, in report order.
    pub fn reported(&self) -> Vec<(WorkItem, Option<Vec<String>>)> {
        self.inner.lock().expect("memory queue poisoned").reported.clone()
    }

    /// Number of items still waiting in `queue`.
    pub fn depth(&self, queue: &str) -> usize {
        let inner = self.inner.lock().expect("memory queue poisoned");
        inner.queues.get(queue).map(|q| q.len()).unwrap_or(0)
    }
}

#[async_trait]
impl QueueClient for MemoryQueue {
    async fn pop_workitem(&self, wiq: &str) -> Result<Option<WorkItem>> {
        let item = {
            let mut inner = self.inner.lock().expect("memory queue poisoned");
            inner.queues.get_mut(wiq).and_then(|q| q.pop_front())
        };
        metrics::queue_operations().add(
            1,
            &[
                KeyValue::new("queue", wiq.to_string()),
                KeyValue::new(
                    "operation",
                    if item.is_some() { "pop" } else { "pop_empty" },
                ),
            ],
        );
        Ok(item)
    }

    async fn update_workitem(&self, item: WorkItem, files: Option<Vec<String>>) -> Result<()> {
        debug!(id = %item.id, state = %item.state, "work item reported");
        let mut inner = self.inner.lock().expect("memory queue poisoned");
        inner.reported.push((item, files));
        Ok(())
    }

    async fn register_queue(&self, queue: &str, on_notify: NotifyCallback) -> Result<String> {
        let mut inner = self.inner.lock().expect("memory queue poisoned");
        inner
            .notify
            .entry(queue.to_string())
            .or_default()
            .push(on_notify);
        Ok(queue.to_string())
    }

    async fn on_client_event(&self, callback: EventCallback) -> Result<String> {
        let mut inner = self.inner.lock().expect("memory queue poisoned");
        inner.events.push(callback);
        Ok(format!("sub-{}", inner.events.len()))
    }

    async fn disconnect(&self) -> Result<()> {
        let mut inner = self.inner.lock().expect("memory queue poisoned");
        inner.notify.clear();
        inner.events.clear();
        Ok(())
    }
}
