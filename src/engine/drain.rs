//! The drain loop: pop work items one at a time until the queue is empty,
//! run each through the processing wrapper, sweep artifacts between items.
//!
//! Items are strictly sequential — cleanup for item N completes before item
//! N+1 is popped, so the working directory is never shared between items.

use std::collections::HashSet;
use std::sync::Arc;

use opentelemetry::KeyValue;
use tracing::{Instrument, debug, error, info};

use crate::client::QueueClient;
use crate::error::Result;
use crate::model::WorkItem;
use crate::processor::Processor;
use crate::telemetry::metrics;
use crate::telemetry::work::{record_state_transition, start_item_span};
use crate::tracker::ArtifactTracker;

/// What one drain pass accomplished.
#[derive(Debug, Clone, Copy)]
pub struct PassOutcome {
    /// Items popped and reported during the pass.
    pub processed: usize,
}

/// Pops and processes work items until the queue reports empty.
pub struct DrainLoop {
    client: Arc<dyn QueueClient>,
    processor: Arc<dyn Processor>,
    tracker: ArtifactTracker,
    /// Snapshot of the working directory taken once at startup. Everything
    /// the directory accumulates beyond this is swept between items.
    baseline: HashSet<String>,
    wiq: String,
}

impl DrainLoop {
    /// Build a drain loop, capturing the working-directory baseline now.
    pub fn new(
        client: Arc<dyn QueueClient>,
        processor: Arc<dyn Processor>,
        tracker: ArtifactTracker,
        wiq: impl Into<String>,
    ) -> Self {
        let baseline = tracker.snapshot();
        debug!(
            dir = %tracker.dir().display(),
            files = baseline.len(),
            "working-directory baseline captured"
        );
        Self {
            client,
            processor,
            tracker,
            baseline,
            wiq: wiq.into(),
        }
    }

    /// Run one drain pass to queue-empty.
    ///
    /// A pop or report failure ends the pass early; the final sweep still
    /// runs. The caller owns the single-flight guard — this method assumes it
    /// is the only pass in flight.
    pub async fn drain(&self) -> Result<PassOutcome> {
        let result = self.drain_inner().await;
        // Pass-end sweep runs whether the pass completed or aborted.
        self.tracker.cleanup(&self.baseline);
        result
    }

    async fn drain_inner(&self) -> Result<PassOutcome> {
        let mut processed = 0;
        loop {
            let Some(item) = self.client.pop_workitem(&self.wiq).await? else {
                break;
            };
            processed += 1;
            self.process_one(item).await;
            self.tracker.cleanup(&self.baseline);
        }

        if processed > 0 {
            info!(queue = %self.wiq, processed, "no more work items in queue");
        }
        Ok(PassOutcome { processed })
    }

    /// The processing wrapper: run the processor, absorb any failure into the
    /// retry state, report back exactly once, then restore the baseline.
    async fn process_one(&self, mut item: WorkItem) {
        let span = start_item_span(&self.wiq, &item.id);

        async {
            match self.processor.process(&mut item).await {
                Ok(()) => match item.mark_successful() {
                    Ok(()) => record_state_transition(&span, "pending", "successful"),
                    // The item arrived already terminal; report it back as-is.
                    Err(e) => error!(id = %item.id, state = %item.state, "state stamp rejected: {e}"),
                },
                Err(e) => {
                    error!(id = %item.id, "processing failed: {e}");
                    match item.mark_retry(&e.to_string()) {
                        Ok(()) => record_state_transition(&span, "pending", "retry"),
                        Err(e) => {
                            error!(id = %item.id, state = %item.state, "state stamp rejected: {e}")
                        }
                    }
                }
            }

            metrics::items_processed().add(
                1,
                &[KeyValue::new("state", item.state.to_string())],
            );

            let new_files = self.tracker.diff(&self.baseline);
            let files = if new_files.is_empty() {
                None
            } else {
                metrics::artifacts_captured().add(new_files.len() as u64, &[]);
                Some(new_files)
            };

            // Report-back relinquishes the item; a failure here is logged and
            // absorbed so the pass (and the sweep below) continue.
            let id = item.id.clone();
            if let Err(e) = self.client.update_workitem(item, files).await {
                error!(id = %id, "report-back failed: {e}");
            }

            self.tracker.cleanup(&self.baseline);
        }
        .instrument(span.clone())
        .await
    }
}
