//! # drainq
//!
//! Event-driven work-item queue drain agent.
//!
//! Consumes work items from a remote queue through the [`client::QueueClient`]
//! seam, processes each item one at a time, attaches files created during
//! processing as artifacts, and reports success or retry state back to the
//! queue owner. Notifications arriving on foreign threads are bridged into a
//! single cooperative drain-worker task by the [`engine::Scheduler`].

pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod processor;
pub mod telemetry;
pub mod tracker;
