//! Shared state handed to every HTTP handler

use std::time::Instant;

use tokio::sync::watch;

use crate::store::MemoryDocStore;
use crate::tasks::TimerView;
use crate::timer::TimerStore;

/// Everything the handlers need: the timer document handle, the service
/// ticker's latest view, and server metadata.
pub struct AppState {
    pub timer: TimerStore<MemoryDocStore>,
    /// Latest view published by the service ticker.
    pub ticker_view: watch::Receiver<TimerView>,
    pub start_time: Instant,
    pub host: String,
    pub port: u16,
}

impl AppState {
    pub fn new(
        timer: TimerStore<MemoryDocStore>,
        ticker_view: watch::Receiver<TimerView>,
        host: String,
        port: u16,
    ) -> Self {
        Self {
            timer,
            ticker_view,
            start_time: Instant::now(),
            host,
            port,
        }
    }

    /// Server uptime as a short human-readable string.
    pub fn uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }
}
