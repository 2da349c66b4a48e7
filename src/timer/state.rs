//! The shared timer document

use serde::{Deserialize, Serialize};

use crate::auth::Principal;

/// Which countdown leg is active. The two phases alternate indefinitely
/// while the timer runs; there is no terminal phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Main,
    Rotation,
}

impl Phase {
    /// The other leg.
    pub fn flipped(self) -> Self {
        match self {
            Phase::Main => Phase::Rotation,
            Phase::Rotation => Phase::Main,
        }
    }
}

/// Snapshot of the single shared timer document.
///
/// Field names mirror the persisted JSON document. Invariants maintained by
/// the transition operations:
/// - `is_paused` implies `is_running`;
/// - `end_at` is set if and only if running and not paused;
/// - `remaining_ms` is only meaningful while paused.
///
/// Every field defaults so that a partially written document from an older
/// client still deserializes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimerState {
    pub phase: Phase,
    pub main_duration_ms: u64,
    pub rotation_duration_ms: u64,
    pub is_running: bool,
    pub is_paused: bool,
    /// Deadline of the current leg, epoch milliseconds, server clock.
    pub end_at: Option<i64>,
    /// Time left captured at the moment of pausing.
    #[serde(rename = "_remainingMs")]
    pub remaining_ms: Option<u64>,
    pub last_updated_by: Option<Principal>,
    /// Server-assigned commit timestamp, epoch milliseconds.
    pub last_updated_at: Option<i64>,
}

impl TimerState {
    /// Configured duration of the given phase.
    pub fn duration_for(&self, phase: Phase) -> u64 {
        match phase {
            Phase::Main => self.main_duration_ms,
            Phase::Rotation => self.rotation_duration_ms,
        }
    }

    /// Remaining time at `now_ms`, as a display client computes it: zero
    /// when idle, the pause snapshot when paused, otherwise the distance to
    /// the deadline clamped at zero.
    pub fn remaining_at(&self, now_ms: i64) -> u64 {
        if !self.is_running {
            return 0;
        }
        if self.is_paused {
            return self.remaining_ms.unwrap_or(0);
        }
        match self.end_at {
            Some(end_at) => (end_at - now_ms).max(0) as u64,
            None => 0,
        }
    }

    /// Whether the current leg's deadline has passed as of `now_ms`.
    /// Only a running, unpaused timer with a deadline can be due.
    pub fn is_due(&self, now_ms: i64) -> bool {
        self.is_running && !self.is_paused && self.end_at.map(|end| end <= now_ms).unwrap_or(false)
    }
}
