//! External queue client contract.
//!
//! The agent consumes the queue through this narrow seam: pop one item,
//! report one item back, bind a notification callback, observe connection
//! lifecycle events. The wire protocol, authentication, and how
//! notifications are physically transported all live behind it.

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::WorkItem;

/// A queue notification delivered to a registered callback.
#[derive(Debug, Clone)]
pub struct QueueNotice {
    /// The queue that has new work.
    pub queue: String,
}

/// Connection lifecycle events raised by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Connected and authenticated; safe to register queues.
    SignedIn,
    /// Connection lost. Reconnection is the client's responsibility.
    Disconnected,
    /// Anything else the client emits. Ignored by the agent.
    Other(String),
}

/// Invoked when the queue has new work, with a delivery sequence number.
///
/// May be called from any client-owned thread, concurrently with in-flight
/// drains — the receiver must do its own serialization.
pub type NotifyCallback = Arc<dyn Fn(QueueNotice, u64) + Send + Sync>;

/// Invoked for connection lifecycle events, with a delivery sequence number.
pub type EventCallback = Arc<dyn Fn(ClientEvent, u64) + Send + Sync>;

/// The contract the agent requires from the external queue client.
#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Pop the next work item from `wiq`. `None` is the empty-marker.
    async fn pop_workitem(&self, wiq: &str) -> Result<Option<WorkItem>>;

    /// Report an item back to the queue owner, attaching artifact files when
    /// present. Called exactly once per popped item; this relinquishes the
    /// item — the agent never touches it afterward.
    async fn update_workitem(&self, item: WorkItem, files: Option<Vec<String>>) -> Result<()>;

    /// Bind a notification callback to `queue`. Returns the resolved queue
    /// name the client subscribed under.
    async fn register_queue(&self, queue: &str, on_notify: NotifyCallback) -> Result<String>;

    /// Subscribe to connection lifecycle events. Returns a subscription id.
    async fn on_client_event(&self, callback: EventCallback) -> Result<String>;

    /// Release the connection.
    async fn disconnect(&self) -> Result<()>;
}
