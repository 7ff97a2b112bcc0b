//! Connection lifecycle handling.
//!
//! Reacts to sign-in and disconnect events from the queue client: sign-in
//! binds the notification callback that feeds the scheduler, disconnect is
//! logged and left to the client to recover from.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::client::{ClientEvent, EventCallback, NotifyCallback, QueueClient};
use crate::config::ShutdownPolicy;
use crate::error::Result;

use super::scheduler::Scheduler;

/// Handles `SignedIn` / `Disconnected` events from the client.
pub struct LifecycleHandler {
    client: Arc<dyn QueueClient>,
    scheduler: Arc<Scheduler>,
    queue: String,
    policy: ShutdownPolicy,
}

impl LifecycleHandler {
    pub fn new(
        client: Arc<dyn QueueClient>,
        scheduler: Arc<Scheduler>,
        queue: impl Into<String>,
        policy: ShutdownPolicy,
    ) -> Self {
        Self {
            client,
            scheduler,
            queue: queue.into(),
            policy,
        }
    }

    /// Subscribe this handler to the client's event stream.
    ///
    /// The client raises events on its own threads; each one is submitted
    /// onto the processing runtime, where failures surface through logs (the
    /// raising thread has no way to observe them). A failed sign-in is fatal:
    /// without queue registration the agent can never receive work.
    pub async fn subscribe(self: Arc<Self>) -> Result<String> {
        let handle = tokio::runtime::Handle::current();
        let this = Arc::clone(&self);

        let callback: EventCallback = Arc::new(move |event, seq| {
            debug!(?event, seq, "client event received");
            let this = Arc::clone(&this);
            handle.spawn(async move {
                let fatal = event == ClientEvent::SignedIn;
                if let Err(e) = this.handle(event).await {
                    error!("lifecycle handler error: {e}");
                    if fatal {
                        std::process::exit(1);
                    }
                }
            });
        });

        let sub_id = self.client.on_client_event(callback).await?;
        info!(sub_id = %sub_id, "client event subscription registered");
        Ok(sub_id)
    }

    /// React to one lifecycle event.
    pub async fn handle(&self, event: ClientEvent) -> Result<()> {
        match event {
            ClientEvent::SignedIn => {
                let scheduler = Arc::clone(&self.scheduler);
                let on_notify: NotifyCallback = Arc::new(move |notice, seq| {
                    info!(queue = %notice.queue, seq, "queue notification received");
                    scheduler.notify();
                });

                let name = self.client.register_queue(&self.queue, on_notify).await?;
                info!(queue = %name, "consuming work-item queue");

                // In serverless mode, work may have been queued before the
                // notification channel was live — kick one pass immediately.
                if matches!(self.policy, ShutdownPolicy::ScaleToZero { .. }) {
                    self.scheduler.notify();
                }
                Ok(())
            }
            ClientEvent::Disconnected => {
                info!("disconnected from server");
                Ok(())
            }
            ClientEvent::Other(event) => {
                debug!(event = %event, "ignoring client event");
                Ok(())
            }
        }
    }
}
