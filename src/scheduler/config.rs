//! Scheduler configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Upper bound on a single wait while the queue is empty, in milliseconds
    ///
    /// New submissions wake the dispatch loop early, so this only bounds how
    /// long an idle loop parks before re-checking its running flag.
    #[serde(default = "default_idle_wait_ms")]
    pub idle_wait_ms: u64,
}

fn default_idle_wait_ms() -> u64 {
    500
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { idle_wait_ms: 500 }
    }
}

impl SchedulerConfig {
    /// Get the idle wait as a Duration
    pub fn idle_wait(&self) -> Duration {
        Duration::from_millis(self.idle_wait_ms)
    }
}
