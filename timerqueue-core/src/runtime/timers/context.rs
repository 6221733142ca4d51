//! Fire-notification seam between [`TimerQueue::advance`] and scheduled
//! objects.

use super::identity::TimerHandle;
use super::queue::TimerQueue;

/// A value that can be scheduled and notified when its deadline passes.
///
/// The trait is implemented by the pointee; the queue itself stores handles
/// (`Rc<Self>`, `Arc<Self>`, `Box<Self>`, `&Self`). A notification runs after the
/// fired entry has left the queue, so `ctx` may freely schedule, reschedule
/// or unschedule anything, including the object being fired.
pub trait TimerObject<T> {
    /// Called once per firing with the time the entry was scheduled for.
    fn on_timer<P>(&self, fired_at: T, ctx: &mut FireContext<'_, P, T>)
    where
        P: TimerHandle<Target = Self> + Clone;
}

/// Access to the owning queue from inside a notification.
pub struct FireContext<'a, P, T> {
    queue: &'a mut TimerQueue<P, T>,
    handle: &'a P,
}

impl<'a, P, T> FireContext<'a, P, T> {
    pub(crate) fn new(queue: &'a mut TimerQueue<P, T>, handle: &'a P) -> Self {
        Self { queue, handle }
    }

    /// Handle of the object being fired.
    #[must_use]
    pub fn handle(&self) -> &P {
        self.handle
    }

    /// The queue driving this notification.
    pub fn queue(&mut self) -> &mut TimerQueue<P, T> {
        self.queue
    }
}

impl<P, T> FireContext<'_, P, T>
where
    P: TimerHandle + Clone,
    T: Ord + Copy,
{
    /// Schedules the fired object again at `at`.
    pub fn rearm(&mut self, at: T) {
        self.queue.schedule(self.handle.clone(), at);
    }

    /// Cancels a previous [`rearm`](Self::rearm) of the fired object.
    pub fn disarm(&mut self) -> Option<T> {
        self.queue.unschedule(self.handle)
    }
}
