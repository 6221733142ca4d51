//! Identity-keyed timer queue.
//!
//! Entries live in a binary min-heap ordered by:
//! - primary key: firing time ascending
//! - tiebreaker: sequence number of the latest `schedule` call ascending
//!
//! A side index maps each object's [`TimerKey`] to its heap slot so that an
//! already queued object is rescheduled with one sift instead of a scan.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::fmt;
use super::context::{FireContext, TimerObject};
use super::identity::{TimerHandle, TimerKey};
use super::stats::TimerQueueStats;

#[derive(Clone)]
struct Entry<P, T> {
    key: TimerKey,
    handle: P,
    at: T,
    seq: u64,
}

impl<P, T: Ord> Entry<P, T> {
    fn precedes(&self, other: &Self) -> bool {
        self.at
            .cmp(&other.at)
            .then_with(|| self.seq.cmp(&other.seq))
            == Ordering::Less
    }
}

/// Mutable timer priority queue.
///
/// `P` is a [`TimerHandle`] to the scheduled object (`Rc<O>`, `Arc<O>`,
/// `Box<O>` or `&O`) and `T` is the firing time. Objects are told apart by
/// identity, so each one is queued at most once and scheduling it again
/// moves its entry. Zero-sized objects need `Rc`/`Arc` handles to stay
/// distinct.
///
/// The queue is not synchronized; share it across threads behind a mutex.
#[derive(Clone)]
pub struct TimerQueue<P, T> {
    entries: Vec<Entry<P, T>>,
    index: BTreeMap<TimerKey, usize>,
    next_seq: u64,
    stats: TimerQueueStats,
}

impl<P, T> Default for TimerQueue<P, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, T> fmt::Debug for TimerQueue<P, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerQueue")
            .field("len", &self.entries.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl<P, T> TimerQueue<P, T> {
    /// Creates an empty queue.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: BTreeMap::new(),
            next_seq: 0,
            stats: TimerQueueStats::new(),
        }
    }

    /// Creates an empty queue with room for `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            ..Self::new()
        }
    }

    /// Returns number of scheduled objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when nothing is scheduled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns operation counters.
    #[must_use]
    pub fn stats(&self) -> TimerQueueStats {
        self.stats
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        let dropped = u64::try_from(self.entries.len()).unwrap_or(u64::MAX);
        self.stats.removals = self.stats.removals.saturating_add(dropped);
        self.entries.clear();
        self.index.clear();
    }
}

impl<P, T: Copy> TimerQueue<P, T> {
    /// Returns the first firing time without removal.
    #[must_use]
    pub fn next_deadline(&self) -> Option<T> {
        self.entries.first().map(|entry| entry.at)
    }

    /// Returns the first object and its time without removal.
    #[must_use]
    pub fn peek_first(&self) -> Option<(&P, T)> {
        self.entries.first().map(|entry| (&entry.handle, entry.at))
    }
}

impl<P, T> TimerQueue<P, T>
where
    P: TimerHandle,
    T: Ord + Copy,
{
    /// Schedules `handle` to fire at `at`.
    ///
    /// An object that is already queued keeps its single entry and only its
    /// time changes; any time is accepted, including past ones.
    pub fn schedule(&mut self, handle: P, at: T) {
        let key = TimerKey::of(&handle);
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);

        if let Some(&pos) = self.index.get(&key) {
            let entry = &mut self.entries[pos];
            entry.at = at;
            entry.seq = seq;
            self.stats.reschedules += 1;
            self.restore(pos);
            log::trace!("timer rescheduled ({} pending)", self.entries.len());
            return;
        }

        let pos = self.entries.len();
        self.entries.push(Entry {
            key,
            handle,
            at,
            seq,
        });
        let _ = self.index.insert(key, pos);
        self.stats.inserts += 1;
        self.sift_up(pos);
        log::trace!("timer scheduled ({} pending)", self.entries.len());
    }

    /// Removes the object behind `handle`, returning the time it was due.
    pub fn unschedule<Q>(&mut self, handle: &Q) -> Option<T>
    where
        Q: TimerHandle<Target = P::Target>,
    {
        let pos = *self.index.get(&TimerKey::of(handle))?;
        let entry = self.remove_at(pos);
        self.stats.removals += 1;
        Some(entry.at)
    }

    /// Returns the time the object behind `handle` is scheduled for.
    #[must_use]
    pub fn scheduled_time<Q>(&self, handle: &Q) -> Option<T>
    where
        Q: TimerHandle<Target = P::Target>,
    {
        self.index
            .get(&TimerKey::of(handle))
            .map(|&pos| self.entries[pos].at)
    }

    /// Returns true when the object behind `handle` is queued.
    #[must_use]
    pub fn is_scheduled<Q>(&self, handle: &Q) -> bool
    where
        Q: TimerHandle<Target = P::Target>,
    {
        self.index.contains_key(&TimerKey::of(handle))
    }

    /// Removes and returns the first object and its time.
    pub fn pop_first(&mut self) -> Option<(P, T)> {
        let entry = self.take_first()?;
        self.stats.removals += 1;
        Some((entry.handle, entry.at))
    }

    /// Pops every entry due at or before `now` in firing order and hands it
    /// to `on_due` together with the queue.
    ///
    /// Each entry is fully removed before `on_due` runs, so the callback may
    /// mutate the queue; anything it schedules at or before `now` fires
    /// during this same call. Returns the number of entries handed out.
    pub fn advance_with<F>(&mut self, now: T, mut on_due: F) -> usize
    where
        F: FnMut(&mut Self, P, T),
    {
        let mut fired = 0_usize;
        while self.next_deadline().is_some_and(|at| at <= now) {
            let Some(entry) = self.take_first() else {
                break;
            };
            self.stats.fired += 1;
            fired += 1;
            log::trace!("timer fired ({} pending)", self.entries.len());
            on_due(self, entry.handle, entry.at);
        }
        if fired > 0 {
            log::debug!(
                "advance fired {fired} timers, {} still pending",
                self.entries.len()
            );
        }
        fired
    }

    /// Fires every object due at or before `now` through
    /// [`TimerObject::on_timer`], in firing order.
    pub fn advance(&mut self, now: T) -> usize
    where
        P: Clone,
        P::Target: TimerObject<T>,
    {
        self.advance_with(now, |queue, handle, at| {
            let mut ctx = FireContext::new(queue, &handle);
            handle.on_timer(at, &mut ctx);
        })
    }

    fn take_first(&mut self) -> Option<Entry<P, T>> {
        if self.entries.is_empty() {
            return None;
        }
        Some(self.remove_at(0))
    }

    fn remove_at(&mut self, pos: usize) -> Entry<P, T> {
        let entry = self.entries.swap_remove(pos);
        let _ = self.index.remove(&entry.key);
        if let Some(moved) = self.entries.get(pos) {
            let _ = self.index.insert(moved.key, pos);
            self.restore(pos);
        }
        entry
    }

    /// Moves the entry at `pos` up or down until the heap order holds again.
    fn restore(&mut self, pos: usize) {
        if self.sift_up(pos) == pos {
            self.sift_down(pos);
        }
    }

    /// Returns the slot the entry settled in.
    fn sift_up(&mut self, mut pos: usize) -> usize {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if !self.entries[pos].precedes(&self.entries[parent]) {
                break;
            }
            self.swap(pos, parent);
            pos = parent;
        }
        pos
    }

    fn sift_down(&mut self, mut pos: usize) {
        let len = self.entries.len();
        loop {
            let left = 2 * pos + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let child = if right < len && self.entries[right].precedes(&self.entries[left]) {
                right
            } else {
                left
            };
            if !self.entries[child].precedes(&self.entries[pos]) {
                break;
            }
            self.swap(pos, child);
            pos = child;
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.entries.swap(a, b);
        let _ = self.index.insert(self.entries[a].key, a);
        let _ = self.index.insert(self.entries[b].key, b);
    }
}
