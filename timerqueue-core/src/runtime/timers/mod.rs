//! Timer scheduling primitives.
//!
//! - [`queue`]: identity-keyed min-heap with in-place rescheduling
//! - [`context`]: the fire-notification seam used by [`TimerQueue::advance`]
//! - [`identity`]: how scheduled objects are told apart
//! - [`stats`]: operation counters
//! - [`wait`]: event-loop helpers for turning deadlines into poll timeouts

pub mod context;
pub mod identity;
pub mod queue;
pub mod stats;
pub mod wait;

pub use context::{FireContext, TimerObject};
pub use identity::{TimerHandle, TimerKey};
pub use queue::TimerQueue;
pub use stats::TimerQueueStats;
