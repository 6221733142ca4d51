//! Runtime building blocks grouped by domain.

pub mod timers;
