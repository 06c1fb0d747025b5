//! Task wrapper pairing a unit of work with its due time

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};

/// Error produced by a failed unit of work
pub type WorkError = Box<dyn std::error::Error + Send + Sync + 'static>;

type WorkFn = Box<dyn FnOnce() -> Result<(), WorkError> + Send + 'static>;

/// Construction-order tie break for tasks sharing a due time
static NEXT_SEQ: AtomicU64 = AtomicU64::new(0);

/// A unit of work and the earliest instant it may run
///
/// Tasks order by due time, earliest first; tasks sharing a due time keep
/// their construction order. Both fields are fixed at construction.
pub struct ScheduledTask {
    due_at: DateTime<Utc>,
    work: WorkFn,
    seq: u64,
}

impl ScheduledTask {
    /// Wrap a unit of work to run no earlier than `due_at`
    pub fn new(
        due_at: DateTime<Utc>,
        work: impl FnOnce() -> Result<(), WorkError> + Send + 'static,
    ) -> Self {
        Self {
            due_at,
            work: Box::new(work),
            seq: NEXT_SEQ.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// True once `now` has reached the due time
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now >= self.due_at
    }

    /// The earliest instant this task may run
    pub fn due_at(&self) -> DateTime<Utc> {
        self.due_at
    }

    /// Run the wrapped work in the caller's context, consuming the task
    ///
    /// The task has no effect of its own beyond whatever the work does.
    pub fn invoke(self) -> Result<(), WorkError> {
        (self.work)()
    }
}

impl fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("due_at", &self.due_at)
            .field("seq", &self.seq)
            .finish()
    }
}

impl Eq for ScheduledTask {}

impl PartialEq for ScheduledTask {
    fn eq(&self, other: &Self) -> bool {
        self.due_at == other.due_at && self.seq == other.seq
    }
}

impl Ord for ScheduledTask {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Earlier due time first, then construction order (so it's "greater" in the heap)
        other
            .due_at
            .cmp(&self.due_at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for ScheduledTask {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
