//! Cross-context scheduling of drain passes.
//!
//! Queue notifications arrive on whatever thread the client transport owns.
//! The scheduler bridges them into the one cooperative drain-worker task via
//! a bounded channel and owns the single-flight guard: a notification that
//! lands mid-drain is dropped, not queued. Bursts arriving between passes
//! coalesce into at most one pending pass.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use opentelemetry::KeyValue;
use tokio::sync::Notify;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::ShutdownPolicy;
use crate::telemetry::metrics;

use super::drain::DrainLoop;

/// Holds the single-flight guard for the duration of one pass.
/// Release is unconditional — Drop clears the flag even if the pass errored.
struct DrainGuard {
    draining: Arc<AtomicBool>,
}

impl DrainGuard {
    fn hold(draining: &Arc<AtomicBool>) -> Self {
        draining.store(true, Ordering::SeqCst);
        Self {
            draining: Arc::clone(draining),
        }
    }
}

impl Drop for DrainGuard {
    fn drop(&mut self) {
        self.draining.store(false, Ordering::SeqCst);
    }
}

/// Owns the guard and the channel into the drain worker.
///
/// Constructed once at startup and handed to everything that needs to
/// trigger a drain — there is no ambient global state.
pub struct Scheduler {
    tx: mpsc::Sender<()>,
    draining: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
}

impl Scheduler {
    /// Spawn the drain worker and return the scheduler plus its join handle.
    ///
    /// The worker is the sole context that runs drain passes. When `policy`
    /// is scale-to-zero, the process exits with status 0 after the first
    /// completed pass observes the queue empty.
    pub fn spawn(drain: Arc<DrainLoop>, policy: ShutdownPolicy) -> (Arc<Self>, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<()>(1);
        let draining = Arc::new(AtomicBool::new(false));
        let shutdown = Arc::new(Notify::new());

        let worker_flag = Arc::clone(&draining);
        let worker_shutdown = Arc::clone(&shutdown);
        let worker = tokio::spawn(async move {
            loop {
                // Shutdown is only observed between passes — an in-flight
                // pass always finishes and reports.
                let ticket = tokio::select! {
                    _ = worker_shutdown.notified() => {
                        info!("drain worker shutting down");
                        break;
                    }
                    ticket = rx.recv() => ticket,
                };
                if ticket.is_none() {
                    break;
                }

                let started = std::time::Instant::now();
                let _guard = DrainGuard::hold(&worker_flag);
                match drain.drain().await {
                    Ok(outcome) => {
                        metrics::drain_pass_duration_ms()
                            .record(started.elapsed().as_millis() as f64, &[]);
                        debug!(processed = outcome.processed, "drain pass complete");
                        if let ShutdownPolicy::ScaleToZero { ref vm_id } = policy {
                            info!(vm_id = %vm_id, "queue drained, exiting serverless VM");
                            std::process::exit(0);
                        }
                    }
                    Err(e) => {
                        // End of pass, not fatal — the guard drops either way.
                        error!("drain pass error: {e}");
                    }
                }
            }
        });

        (
            Arc::new(Self {
                tx,
                draining,
                shutdown,
            }),
            worker,
        )
    }

    /// Hand a notification to the drain worker. Safe to call from any thread,
    /// concurrently. Returns whether a pass was actually scheduled.
    ///
    /// Dropped notifications are a no-op by contract: mid-drain arrivals are
    /// debounced by the guard, and anything beyond one pending pass coalesces.
    pub fn notify(&self) -> bool {
        if self.draining.load(Ordering::SeqCst) {
            debug!("drain in progress, dropping notification");
            metrics::notifications_dropped().add(1, &[KeyValue::new("reason", "draining")]);
            return false;
        }

        match self.tx.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(())) => {
                debug!("drain pass already pending, dropping notification");
                metrics::notifications_dropped().add(1, &[KeyValue::new("reason", "pending")]);
                false
            }
            Err(TrySendError::Closed(())) => {
                warn!("drain worker not running, discarding notification");
                metrics::notifications_dropped().add(1, &[KeyValue::new("reason", "no_worker")]);
                false
            }
        }
    }

    /// Is a drain pass active right now?
    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }

    /// Request graceful shutdown: stop taking new notifications after the
    /// in-flight pass (if any) finishes.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }
}
