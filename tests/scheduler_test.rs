//! Scheduler tests: single-flight guarding, notification drops, worker
//! lifecycle.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use drainq::client::memory::MemoryQueue;
use drainq::client::{EventCallback, NotifyCallback, QueueClient};
use drainq::config::ShutdownPolicy;
use drainq::engine::{DrainLoop, Scheduler};
use drainq::error::Result;
use drainq::model::{Payload, State, WorkItem};
use drainq::processor::Processor;
use drainq::tracker::ArtifactTracker;
use tempfile::tempdir;

const WIQ: &str = "test_queue";

fn item(id: &str) -> WorkItem {
    WorkItem::new(id, Payload::default())
}

/// Takes a fixed time per item, so tests can observe a pass mid-flight.
struct SlowProcessor {
    delay: Duration,
}

#[async_trait]
impl Processor for SlowProcessor {
    async fn process(&self, _item: &mut WorkItem) -> Result<()> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}

/// Delegates to a MemoryQueue while counting empty pops — each drain pass
/// ends with exactly one, so `empty_pops` equals the number of passes run.
struct CountingClient {
    inner: Arc<MemoryQueue>,
    empty_pops: AtomicUsize,
}

#[async_trait]
impl QueueClient for CountingClient {
    async fn pop_workitem(&self, wiq: &str) -> Result<Option<WorkItem>> {
        let popped = self.inner.pop_workitem(wiq).await?;
        if popped.is_none() {
            self.empty_pops.fetch_add(1, Ordering::SeqCst);
        }
        Ok(popped)
    }

    async fn update_workitem(&self, item: WorkItem, files: Option<Vec<String>>) -> Result<()> {
        self.inner.update_workitem(item, files).await
    }

    async fn register_queue(&self, queue: &str, on_notify: NotifyCallback) -> Result<String> {
        self.inner.register_queue(queue, on_notify).await
    }

    async fn on_client_event(&self, callback: EventCallback) -> Result<String> {
        self.inner.on_client_event(callback).await
    }

    async fn disconnect(&self) -> Result<()> {
        self.inner.disconnect().await
    }
}

fn spawn_scheduler(
    client: Arc<dyn QueueClient>,
    delay: Duration,
    dir: &std::path::Path,
) -> (Arc<Scheduler>, tokio::task::JoinHandle<()>) {
    let drain = Arc::new(DrainLoop::new(
        client,
        Arc::new(SlowProcessor { delay }),
        ArtifactTracker::new(dir),
        WIQ,
    ));
    Scheduler::spawn(drain, ShutdownPolicy::Persistent)
}

// ---------------------------------------------------------------------------
// Single flight
// ---------------------------------------------------------------------------

#[tokio::test]
async fn notification_mid_drain_is_dropped() {
    let dir = tempdir().unwrap();
    let queue = MemoryQueue::new();
    queue.push(WIQ, item("wi-1"));

    let (scheduler, worker) = spawn_scheduler(
        Arc::clone(&queue) as Arc<dyn QueueClient>,
        Duration::from_millis(300),
        dir.path(),
    );

    assert!(scheduler.notify(), "first notification should schedule");

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(scheduler.is_draining());
    assert!(!scheduler.notify(), "mid-drain notification must be a no-op");

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(!scheduler.is_draining(), "guard must be released after pass");
    assert_eq!(queue.reported().len(), 1);

    scheduler.shutdown();
    let _ = worker.await;
}

#[tokio::test]
async fn back_to_back_notifications_run_one_pass() {
    let dir = tempdir().unwrap();
    let queue = MemoryQueue::new();
    queue.push(WIQ, item("wi-1"));
    queue.push(WIQ, item("wi-2"));

    let client = Arc::new(CountingClient {
        inner: Arc::clone(&queue),
        empty_pops: AtomicUsize::new(0),
    });

    let (scheduler, worker) = spawn_scheduler(
        Arc::clone(&client) as Arc<dyn QueueClient>,
        Duration::from_millis(100),
        dir.path(),
    );

    scheduler.notify();
    tokio::time::sleep(Duration::from_millis(50)).await;
    // Pass is mid-item; this one hits the guard and is dropped.
    scheduler.notify();

    tokio::time::sleep(Duration::from_millis(400)).await;

    assert_eq!(queue.reported().len(), 2, "both items drain in one pass");
    assert_eq!(
        client.empty_pops.load(Ordering::SeqCst),
        1,
        "exactly one pass should have run"
    );

    scheduler.shutdown();
    let _ = worker.await;
}

// ---------------------------------------------------------------------------
// Worker lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn notify_without_worker_is_discarded_quietly() {
    let dir = tempdir().unwrap();
    let queue = MemoryQueue::new();

    let (scheduler, worker) = spawn_scheduler(
        Arc::clone(&queue) as Arc<dyn QueueClient>,
        Duration::from_millis(10),
        dir.path(),
    );

    scheduler.shutdown();
    worker.await.unwrap();

    // The worker is gone; the call must not panic, error, or leave anything
    // pending.
    assert!(!scheduler.notify());
    assert!(!scheduler.is_draining());
    assert!(queue.reported().is_empty());
}

#[tokio::test]
async fn graceful_shutdown_finishes_in_flight_pass() {
    let dir = tempdir().unwrap();
    let queue = MemoryQueue::new();
    queue.push(WIQ, item("wi-1"));

    let (scheduler, worker) = spawn_scheduler(
        Arc::clone(&queue) as Arc<dyn QueueClient>,
        Duration::from_millis(200),
        dir.path(),
    );

    scheduler.notify();
    tokio::time::sleep(Duration::from_millis(50)).await;
    scheduler.shutdown();
    worker.await.unwrap();

    // The in-flight item was processed and reported before the worker left.
    let reported = queue.reported();
    assert_eq!(reported.len(), 1);
    assert_eq!(reported[0].0.state, State::Successful);
}
