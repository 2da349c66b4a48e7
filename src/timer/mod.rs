//! The shared rotation timer core
//!
//! This module owns the timer document, the transition operations that are
//! the only way to mutate it, and the live subscription feed. The tick
//! loop that drives displays and the phase auto-switch lives in
//! `crate::tasks`.

pub mod error;
pub mod math;
pub mod state;
pub mod store;
pub mod subscription;

// Re-export main types
pub use error::TimerError;
pub use state::{Phase, TimerState};
pub use store::{TimerStore, TIMER_DOC_KEY};
pub use subscription::TimerSubscription;
