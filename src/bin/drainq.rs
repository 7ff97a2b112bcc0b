//! drainq CLI — operator interface to the drain agent.
//!
//! Both subcommands run against the in-process dev queue; a real deployment
//! links the library against its queue transport instead.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use drainq::client::memory::MemoryQueue;
use drainq::client::{ClientEvent, QueueClient};
use drainq::config::{Config, ShutdownPolicy};
use drainq::engine::{DrainLoop, LifecycleHandler, Scheduler};
use drainq::model::{Payload, WorkItem};
use drainq::processor::DefaultProcessor;
use drainq::telemetry::{TelemetryConfig, init_telemetry};
use drainq::tracker::ArtifactTracker;
use tokio::task::JoinHandle;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "drainq", about = "Work-item queue drain agent")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the agent daemon against the in-process dev queue
    Serve {
        /// Working directory observed for artifacts
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        /// Simulated processing delay in milliseconds
        #[arg(long, default_value_t = 2000)]
        delay_ms: u64,
    },
    /// Push items into an ephemeral dev queue and drain it to empty
    Submit {
        /// JSON payload for each item
        #[arg(long)]
        payload: Option<String>,
        /// Number of items to push
        #[arg(long, default_value_t = 1)]
        count: usize,
        /// Working directory observed for artifacts
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        /// Simulated processing delay in milliseconds
        #[arg(long, default_value_t = 200)]
        delay_ms: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Command::Serve { dir, delay_ms } => cmd_serve(dir, delay_ms).await,
        Command::Submit {
            payload,
            count,
            dir,
            delay_ms,
        } => cmd_submit(payload, count, dir, delay_ms).await,
    }
}

/// A running agent wired against the dev queue.
struct Agent {
    client: Arc<MemoryQueue>,
    scheduler: Arc<Scheduler>,
    worker: JoinHandle<()>,
}

/// Assemble the agent: tracker, processor, drain loop, scheduler, lifecycle
/// subscription — then raise the sign-in event that triggers registration.
async fn start_agent(
    config: &Config,
    dir: &Path,
    delay: Duration,
    policy: ShutdownPolicy,
) -> anyhow::Result<Agent> {
    let client = MemoryQueue::new();
    let tracker = ArtifactTracker::new(dir);
    let processor = Arc::new(DefaultProcessor::new(dir, delay));

    let drain = Arc::new(DrainLoop::new(
        client.clone() as Arc<dyn QueueClient>,
        processor,
        tracker,
        &config.wiq,
    ));
    let (scheduler, worker) = Scheduler::spawn(drain, policy.clone());

    let lifecycle = Arc::new(LifecycleHandler::new(
        client.clone() as Arc<dyn QueueClient>,
        Arc::clone(&scheduler),
        &config.queue,
        policy,
    ));
    lifecycle.subscribe().await?;

    client.raise_event(ClientEvent::SignedIn);

    Ok(Agent {
        client,
        scheduler,
        worker,
    })
}

async fn cmd_serve(dir: PathBuf, delay_ms: u64) -> anyhow::Result<()> {
    let config = Config::from_env()?;

    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "drainq".to_string(),
        log_level: config.log_level.clone(),
    })?;

    let agent = start_agent(
        &config,
        &dir,
        Duration::from_millis(delay_ms),
        config.shutdown.clone(),
    )
    .await?;

    tokio::signal::ctrl_c().await.ok();
    tracing::info!("shutting down...");

    agent.scheduler.shutdown();
    let _ = agent.worker.await;
    agent.client.disconnect().await?;
    Ok(())
}

async fn cmd_submit(
    payload: Option<String>,
    count: usize,
    dir: PathBuf,
    delay_ms: u64,
) -> anyhow::Result<()> {
    let config = Config::from_env()?;

    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "drainq".to_string(),
        log_level: config.log_level.clone(),
    })?;

    // The ephemeral round stays resident until every report-back lands, so
    // force the persistent policy regardless of SF_VMID.
    let agent = start_agent(
        &config,
        &dir,
        Duration::from_millis(delay_ms),
        ShutdownPolicy::Persistent,
    )
    .await?;

    let payload = match payload {
        Some(json) => Payload::Raw(json),
        None => Payload::default(),
    };
    for _ in 0..count {
        agent.client.push(
            &config.wiq,
            WorkItem::new(Uuid::new_v4().to_string(), payload.clone()),
        );
    }

    // Wait for all report-backs (the drain worker runs them one at a time).
    let deadline = tokio::time::Instant::now() + Duration::from_secs(60);
    while agent.client.reported().len() < count {
        if tokio::time::Instant::now() > deadline {
            anyhow::bail!("timed out waiting for {count} report-backs");
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    for (item, files) in agent.client.reported() {
        println!(
            "{}  state={}  files={}",
            item.id,
            item.state,
            files.map(|f| f.join(",")).unwrap_or_else(|| "-".to_string())
        );
    }

    agent.scheduler.shutdown();
    let _ = agent.worker.await;
    agent.client.disconnect().await?;
    Ok(())
}
