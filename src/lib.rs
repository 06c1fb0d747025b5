//! TimeQueue - time-ordered in-memory task scheduler
//!
//! TimeQueue accepts tasks tagged with a "not-before" due time, holds them
//! until that time arrives, dispatches each one to asynchronous execution
//! exactly once, and tracks aggregate completion state through lock-free
//! counters.
//!
//! # Core Concepts
//!
//! - **Sleep Until Due**: the dispatch loop parks until the next deadline or
//!   a new submission, it never polls
//! - **At-Most-Once Dispatch**: a single background consumer removes tasks
//!   under one lock acquisition
//! - **Fire and Forget**: a failing or panicking unit of work becomes a
//!   counter increment, never a dead loop
//!
//! # Modules
//!
//! - [`scheduler`] - the scheduler, its task wrapper, counters, and configuration

pub mod scheduler;

// Re-export commonly used types
pub use scheduler::{
    ScheduledTask, Scheduler, SchedulerConfig, SchedulerError, SchedulerStats, WorkError,
};
