//! Application state module

pub mod app_state;

// Re-export main types
pub use app_state::AppState;
