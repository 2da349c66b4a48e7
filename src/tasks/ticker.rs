//! Client tick loop
//!
//! Every subscriber runs one of these: a fixed-period loop that recomputes
//! the displayed remaining time from the last delivered document and the
//! local clock, and (for controllers) opportunistically attempts the phase
//! auto-switch once the deadline has locally passed. Ticking is fully
//! distributed: several controllers may run redundant loops against the
//! same document, and the no-op guard inside `auto_switch_phase` lets all
//! but the winning write degenerate harmlessly.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::auth::{can_control, Principal};
use crate::store::DocumentStore;
use crate::timer::math::{format_remaining, now_ms};
use crate::timer::state::{Phase, TimerState};
use crate::timer::TimerStore;

/// Recommended tick period for interactive displays.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(250);

/// What a display client shows for the timer at one tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerView {
    pub phase: Phase,
    pub is_running: bool,
    pub is_paused: bool,
    pub remaining_ms: u64,
    pub display: String,
}

impl TimerView {
    /// Derive the view from the last known document at local time `now_ms`.
    pub fn from_state(state: Option<&TimerState>, now_ms: i64) -> Self {
        match state {
            Some(state) => {
                let remaining_ms = state.remaining_at(now_ms);
                Self {
                    phase: state.phase,
                    is_running: state.is_running,
                    is_paused: state.is_paused,
                    remaining_ms,
                    display: format_remaining(remaining_ms as i64),
                }
            }
            None => Self::default(),
        }
    }
}

impl Default for TimerView {
    fn default() -> Self {
        Self {
            phase: Phase::Main,
            is_running: false,
            is_paused: false,
            remaining_ms: 0,
            display: format_remaining(0),
        }
    }
}

/// Handle on a spawned ticker. Stopping is idempotent; dropping the handle
/// closes the stop channel, which also winds the loop down.
pub struct TickerHandle {
    view_rx: watch::Receiver<TimerView>,
    stop_tx: watch::Sender<bool>,
    pub task: JoinHandle<()>,
}

impl TickerHandle {
    /// A receiver that always holds the most recent tick's view.
    pub fn view(&self) -> watch::Receiver<TimerView> {
        self.view_rx.clone()
    }

    /// The most recent tick's view.
    pub fn latest(&self) -> TimerView {
        self.view_rx.borrow().clone()
    }

    /// Ask the loop to wind down. Safe to call more than once.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }
}

/// Spawn a ticker for the given (possibly anonymous) user.
pub fn spawn_ticker<S: DocumentStore>(
    timer: TimerStore<S>,
    user: Option<Principal>,
    period: Duration,
) -> TickerHandle {
    let (view_tx, view_rx) = watch::channel(TimerView::default());
    let (stop_tx, stop_rx) = watch::channel(false);
    let task = tokio::spawn(ticker_task(timer, user, period, view_tx, stop_rx));
    TickerHandle {
        view_rx,
        stop_tx,
        task,
    }
}

/// The tick loop itself.
///
/// Keeps the last delivered document, recomputes the view every `period`,
/// and for controllers fires `auto_switch_phase` once the deadline has
/// passed. The auto-switch attempt is fire-and-forget: any failure is
/// logged and the loop carries on, so a flaky store can delay a phase flip
/// but never kill the display.
pub async fn ticker_task<S: DocumentStore>(
    timer: TimerStore<S>,
    user: Option<Principal>,
    period: Duration,
    view_tx: watch::Sender<TimerView>,
    mut stop_rx: watch::Receiver<bool>,
) {
    let controller = can_control(user.as_ref());
    info!(
        "starting ticker: period={:?} controller={}",
        period, controller
    );

    let mut subscription = match timer.subscribe().await {
        Ok(subscription) => subscription,
        Err(e) => {
            error!("ticker could not subscribe to timer document: {}", e);
            return;
        }
    };

    let mut last: Option<TimerState> = None;
    let mut interval = tokio::time::interval(period);

    loop {
        tokio::select! {
            _ = stop_rx.changed() => {
                info!("ticker stopping");
                break;
            }

            update = subscription.next() => {
                match update {
                    Some(state) => last = state,
                    None => {
                        // Feed closed underneath us; the view can no longer
                        // stay fresh.
                        error!("timer document feed closed, ticker exiting");
                        break;
                    }
                }
            }

            _ = interval.tick() => {
                let now = now_ms();
                let _ = view_tx.send(TimerView::from_state(last.as_ref(), now));

                if controller {
                    if let Some(state) = last.as_ref() {
                        if state.is_due(now) {
                            // Best effort: another controller may win the race.
                            if let Some(user) = user.as_ref() {
                                if let Err(e) = timer.auto_switch_phase(user).await {
                                    debug!("auto-switch attempt failed: {}", e);
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}
