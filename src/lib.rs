//! Rotation Timer - a shared countdown timer for chapter meetings
//!
//! This library provides the shared timer document, its transition
//! operations, the live subscription feed, and the per-client tick loop
//! that drives displays and the phase auto-switch.

pub mod api;
pub mod auth;
pub mod config;
pub mod state;
pub mod store;
pub mod tasks;
pub mod timer;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use auth::{can_control, Principal, Role};
pub use config::Config;
pub use state::AppState;
pub use store::{DocumentStore, MemoryDocStore};
pub use tasks::{spawn_ticker, TickerHandle, TimerView};
pub use timer::{Phase, TimerError, TimerState, TimerStore, TimerSubscription};
pub use utils::signals::shutdown_signal;
