//! Work-item processing policy.
//!
//! A processor is the pluggable unit the drain loop routes every popped item
//! through. It may mutate the item, create files in the working directory
//! (captured as artifacts), and take as long as it needs — the drain loop
//! serializes items, so a processor never sees two items at once.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use crate::error::{Error, Result};
use crate::model::{Payload, WorkItem};

/// Per-item processing policy. Swappable without touching the drain loop.
#[async_trait]
pub trait Processor: Send + Sync {
    async fn process(&self, item: &mut WorkItem) -> Result<()>;
}

/// The reference processor, mirroring the original agent's behavior:
/// normalize the payload, stamp names, write a greeting file into the
/// working directory, simulate slow work, serialize the payload back.
pub struct DefaultProcessor {
    dir: PathBuf,
    delay: Duration,
}

impl DefaultProcessor {
    pub fn new(dir: impl Into<PathBuf>, delay: Duration) -> Self {
        Self {
            dir: dir.into(),
            delay,
        }
    }
}

#[async_trait]
impl Processor for DefaultProcessor {
    async fn process(&self, item: &mut WorkItem) -> Result<()> {
        info!(id = %item.id, retries = item.retries, "processing work item");

        let mut payload = item.payload.normalize();
        payload.insert("name".to_string(), Value::String("kitty".to_string()));
        item.name = "Hello kitty".to_string();

        tokio::fs::write(self.dir.join("hello.txt"), "Hello kitty")
            .await
            .map_err(|e| Error::Processing(format!("write greeting file: {e}")))?;

        tokio::time::sleep(self.delay).await;

        item.payload = Payload::to_wire(&payload);
        Ok(())
    }
}
