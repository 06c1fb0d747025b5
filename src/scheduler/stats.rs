//! Dispatch counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Aggregate completion state, mutated only by the dispatch path
///
/// No task identity is retained after completion, counts only.
#[derive(Debug, Default)]
pub(crate) struct DispatchCounters {
    in_flight: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

impl DispatchCounters {
    /// Record a task handed to execution
    pub(crate) fn dispatched(&self) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
    }

    /// Record a completed execution
    ///
    /// The outcome counter moves before in-flight drops, so a caller that
    /// waits for in-flight to reach zero reads settled totals.
    pub(crate) fn completed(&self, success: bool) {
        if success {
            self.succeeded.fetch_add(1, Ordering::SeqCst);
        } else {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    pub(crate) fn in_flight(&self) -> u64 {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn succeeded(&self) -> u64 {
        self.succeeded.load(Ordering::SeqCst)
    }

    pub(crate) fn failed(&self) -> u64 {
        self.failed.load(Ordering::SeqCst)
    }

    pub(crate) fn snapshot(&self) -> SchedulerStats {
        SchedulerStats {
            in_flight: self.in_flight(),
            succeeded: self.succeeded(),
            failed: self.failed(),
        }
    }
}

/// Point-in-time view of the scheduler counters
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Dispatched tasks that have not yet completed
    pub in_flight: u64,
    /// Tasks whose work completed without error
    pub succeeded: u64,
    /// Tasks whose work failed
    pub failed: u64,
}
