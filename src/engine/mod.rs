//! Drain engine: cross-context scheduling, single-flight drain passes,
//! connection lifecycle handling.

pub mod drain;
pub mod lifecycle;
pub mod scheduler;

pub use drain::{DrainLoop, PassOutcome};
pub use lifecycle::LifecycleHandler;
pub use scheduler::Scheduler;
