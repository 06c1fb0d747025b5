//! Scheduler error types

use thiserror::Error;

/// Errors surfaced by scheduler lifecycle operations
///
/// Failures inside a task's own work are not represented here: they are
/// swallowed at the dispatch boundary and reported only through the error
/// counter.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("scheduler is already running")]
    AlreadyRunning,
}
