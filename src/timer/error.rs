//! Error taxonomy for timer operations

use thiserror::Error;

use crate::store::StoreError;

/// Failures surfaced by the timer transition operations.
#[derive(Debug, Error)]
pub enum TimerError {
    /// The acting user's role does not grant timer control. Raised before
    /// any store I/O and never retried.
    #[error("you are not allowed to control the timer")]
    Forbidden,

    /// A supplied argument fails validation (e.g. a zero duration on start).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Passthrough from the document store.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The persisted document no longer parses as a timer state.
    #[error("malformed timer document: {0}")]
    Corrupt(#[from] serde_json::Error),
}
