//! Event-loop helpers.

use core::time::Duration;

use super::queue::TimerQueue;

/// Poll timeout used when no timer is pending.
pub const EMPTY_WAIT_MSEC: i32 = 100_000;

/// Computes milliseconds until `wakeup`, rounding up so a loop never wakes
/// before the deadline.
#[must_use]
pub fn wait_msec(wakeup: Duration, now: Duration) -> i32 {
    let Some(wait) = wakeup.checked_sub(now) else {
        return 0;
    };
    if wait.is_zero() {
        return 0;
    }
    i32::try_from(wait.as_millis().saturating_add(1)).unwrap_or(i32::MAX)
}

/// Milliseconds until the first deadline of `queue`, or `idle_msec` when
/// nothing is scheduled.
#[must_use]
pub fn next_wait_msec<P>(queue: &TimerQueue<P, Duration>, now: Duration, idle_msec: i32) -> i32 {
    queue
        .next_deadline()
        .map_or(idle_msec, |wakeup| wait_msec(wakeup, now))
}
