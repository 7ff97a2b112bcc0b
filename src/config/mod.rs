//! Typed configuration from environment variables.
//!
//! Loads once at startup. Sensitive values wrapped in secrecy::SecretString
//! to prevent log leaks.

pub mod secrets;

use crate::error::Result;
use secrecy::SecretString;

/// Queue name used when no environment variable names one.
pub const DEFAULT_WIQ: &str = "default_queue";

/// What the agent does once it observes the queue empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownPolicy {
    /// Stay resident and wait for the next notification.
    Persistent,
    /// Exit with status 0 after a completed drain pass — the serverless
    /// scale-to-zero behavior. Carries the VM id for logging.
    ScaleToZero { vm_id: String },
}

#[derive(Debug)]
pub struct Config {
    /// The work-item queue to pop from.
    pub wiq: String,
    /// The queue name to register the notification callback under.
    /// Usually the same as `wiq`; producers can split them.
    pub queue: String,
    /// Termination behavior at the queue-empty observation.
    pub shutdown: ShutdownPolicy,
    /// Credential for the queue client, if the transport needs one.
    pub apikey: Option<SecretString>,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// The work-item queue name falls back through an ordered list:
    /// `wiq`, then `SF_AMQPQUEUE`, then [`DEFAULT_WIQ`]. In local dev, call
    /// `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        let wiq = non_empty_var("wiq")
            .or_else(|| non_empty_var("SF_AMQPQUEUE"))
            .unwrap_or_else(|| DEFAULT_WIQ.to_string());
        let queue = non_empty_var("queue").unwrap_or_else(|| wiq.clone());

        let shutdown = match non_empty_var("SF_VMID") {
            Some(vm_id) => ShutdownPolicy::ScaleToZero { vm_id },
            None => ShutdownPolicy::Persistent,
        };

        Ok(Self {
            wiq,
            queue,
            shutdown,
            apikey: non_empty_var("OPENIAP_APIKEY").map(SecretString::from),
            otel_endpoint: non_empty_var("OTEL_ENDPOINT"),
            log_level: non_empty_var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }
}

/// Read an env var, treating unset and empty the same.
fn non_empty_var(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(v) if !v.is_empty() => Some(v),
        _ => None,
    }
}
