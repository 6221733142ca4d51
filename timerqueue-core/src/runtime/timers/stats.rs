//! Operation counters for a timer queue.

/// Snapshot of monotonically increasing queue counters.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TimerQueueStats {
    /// First-time schedules.
    pub inserts: u64,
    /// Schedules that moved an already queued object.
    pub reschedules: u64,
    /// Entries dropped by `pop_first`, `unschedule` or `clear`.
    pub removals: u64,
    /// Notifications delivered by `advance`/`advance_with`.
    pub fired: u64,
}

impl TimerQueueStats {
    /// Returns zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inserts: 0,
            reschedules: 0,
            removals: 0,
            fired: 0,
        }
    }

    /// Total entries ever taken out of the queue.
    #[must_use]
    pub const fn retired(&self) -> u64 {
        self.removals + self.fired
    }
}
