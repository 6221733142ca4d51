#![no_std]

//! Core components of the timer queue workspace.
//!
//! The heart of the crate is [`TimerQueue`], a binary min-heap of
//! timer-bearing objects keyed by identity so that an already queued object
//! can be rescheduled in place.

extern crate alloc;

mod api;
pub mod runtime;

pub use api::bootstrap_signature;
pub use runtime::timers::{
    FireContext, TimerHandle, TimerKey, TimerObject, TimerQueue, TimerQueueStats,
};
