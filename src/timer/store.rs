//! Transition operations on the shared timer document
//!
//! Every mutation of the timer goes through the operations here; nothing
//! else writes the document. Each operation is a single atomic write
//! derived from the previously persisted state, stamped with the acting
//! user and a server-assigned timestamp. Concurrent controllers race under
//! last-write-wins, which the no-op guards make safe: a transition that
//! already happened degenerates into doing nothing.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::auth::Principal;
use crate::store::{DocumentStore, SERVER_TIMESTAMP};
use crate::timer::math::now_ms;
use crate::timer::state::{Phase, TimerState};
use crate::timer::subscription::TimerSubscription;
use crate::timer::TimerError;

/// Key of the single shared timer document.
pub const TIMER_DOC_KEY: &str = "rotationTimer";

/// Handle on the shared timer document in a backing store.
pub struct TimerStore<S> {
    store: Arc<S>,
}

impl<S> Clone for TimerStore<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: DocumentStore> TimerStore<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Current contents of the timer document, if it has been created.
    pub async fn current(&self) -> Result<Option<TimerState>, TimerError> {
        match self.store.get(TIMER_DOC_KEY).await? {
            Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
            None => Ok(None),
        }
    }

    /// Create the document in its idle baseline if it does not exist yet.
    ///
    /// Read-provisioning only, so no authority check: any client may cause
    /// the lazy creation. Idempotent.
    pub async fn ensure_exists(&self) -> Result<TimerState, TimerError> {
        if let Some(state) = self.current().await? {
            return Ok(state);
        }
        info!("timer document absent, writing idle baseline");
        self.store
            .set(
                TIMER_DOC_KEY,
                json!({
                    "phase": Phase::Main,
                    "mainDurationMs": 0,
                    "rotationDurationMs": 0,
                    "isRunning": false,
                    "isPaused": false,
                    "endAt": null,
                    "_remainingMs": null,
                    "lastUpdatedBy": null,
                    "lastUpdatedAt": SERVER_TIMESTAMP,
                }),
                false,
            )
            .await?;
        Ok(self.current().await?.unwrap_or_default())
    }

    /// Overwrite the configured leg durations without touching the running
    /// state. Zero is accepted here; only `start` insists on positive
    /// durations.
    pub async fn set_durations(
        &self,
        user: &Principal,
        main_ms: u64,
        rotation_ms: u64,
    ) -> Result<(), TimerError> {
        guard(user)?;
        info!(
            "{} set durations: main={}ms rotation={}ms",
            user.uid, main_ms, rotation_ms
        );
        self.store
            .set(
                TIMER_DOC_KEY,
                stamped(
                    user,
                    json!({
                        "mainDurationMs": main_ms,
                        "rotationDurationMs": rotation_ms,
                    }),
                ),
                true,
            )
            .await?;
        Ok(())
    }

    /// Begin a fresh session from the main phase, discarding any run in
    /// progress. Starting is not resumable: the deadline is always a full
    /// main leg away.
    pub async fn start(
        &self,
        user: &Principal,
        main_ms: u64,
        rotation_ms: u64,
    ) -> Result<(), TimerError> {
        guard(user)?;
        if main_ms == 0 || rotation_ms == 0 {
            return Err(TimerError::InvalidArgument(
                "both durations must be positive to start".to_string(),
            ));
        }
        let now = now_ms();
        info!(
            "{} started timer: main={}ms rotation={}ms",
            user.uid, main_ms, rotation_ms
        );
        self.store
            .set(
                TIMER_DOC_KEY,
                stamped(
                    user,
                    json!({
                        "phase": Phase::Main,
                        "mainDurationMs": main_ms,
                        "rotationDurationMs": rotation_ms,
                        "isRunning": true,
                        "isPaused": false,
                        "endAt": now + main_ms as i64,
                        "_remainingMs": null,
                    }),
                ),
                false,
            )
            .await?;
        Ok(())
    }

    /// Suspend the running countdown, capturing the time left so `resume`
    /// can rebuild the deadline. No-op on an idle or already paused timer.
    pub async fn pause(&self, user: &Principal) -> Result<(), TimerError> {
        guard(user)?;
        let state = match self.current().await? {
            Some(state) => state,
            None => return Ok(()),
        };
        if !state.is_running || state.is_paused {
            return Ok(());
        }
        let now = now_ms();
        let remaining = state.end_at.map(|end| (end - now).max(0)).unwrap_or(0) as u64;
        info!("{} paused timer with {}ms left", user.uid, remaining);
        self.store
            .update(
                TIMER_DOC_KEY,
                stamped(
                    user,
                    json!({
                        "isPaused": true,
                        "endAt": null,
                        "_remainingMs": remaining,
                    }),
                ),
            )
            .await?;
        Ok(())
    }

    /// Continue a paused countdown from its captured remaining time.
    /// No-op unless paused.
    pub async fn resume(&self, user: &Principal) -> Result<(), TimerError> {
        guard(user)?;
        let state = match self.current().await? {
            Some(state) => state,
            None => return Ok(()),
        };
        if !state.is_paused {
            return Ok(());
        }
        let remaining = state.remaining_ms.unwrap_or(0);
        let now = now_ms();
        info!("{} resumed timer with {}ms left", user.uid, remaining);
        self.store
            .update(
                TIMER_DOC_KEY,
                stamped(
                    user,
                    json!({
                        "isPaused": false,
                        "endAt": now + remaining as i64,
                        "_remainingMs": 0,
                    }),
                ),
            )
            .await?;
        Ok(())
    }

    /// Return the timer to idle on the main phase. Valid from any state;
    /// configured durations survive.
    pub async fn reset(&self, user: &Principal) -> Result<(), TimerError> {
        guard(user)?;
        info!("{} reset timer", user.uid);
        self.store
            .set(
                TIMER_DOC_KEY,
                stamped(
                    user,
                    json!({
                        "phase": Phase::Main,
                        "isRunning": false,
                        "isPaused": false,
                        "endAt": null,
                        "_remainingMs": null,
                    }),
                ),
                true,
            )
            .await?;
        Ok(())
    }

    /// Flip to the other phase once the current leg's deadline has passed.
    ///
    /// Called opportunistically by every controller's tick loop rather than
    /// by a user action. Safe under races: whichever controller's write
    /// lands first moves the deadline into the future, and every later
    /// attempt sees positive remaining time and backs off.
    pub async fn auto_switch_phase(&self, user: &Principal) -> Result<(), TimerError> {
        guard(user)?;
        let state = match self.current().await? {
            Some(state) => state,
            None => return Ok(()),
        };
        let now = now_ms();
        if !state.is_due(now) {
            return Ok(());
        }
        let next = state.phase.flipped();
        let duration = state.duration_for(next);
        debug!(
            "{} auto-switching phase to {:?} for {}ms",
            user.uid, next, duration
        );
        self.store
            .update(
                TIMER_DOC_KEY,
                stamped(
                    user,
                    json!({
                        "phase": next,
                        "endAt": now + duration as i64,
                    }),
                ),
            )
            .await?;
        Ok(())
    }

    /// Open a live feed on the timer document.
    pub async fn subscribe(&self) -> Result<TimerSubscription, TimerError> {
        Ok(TimerSubscription::new(
            self.store.watch(TIMER_DOC_KEY).await?,
        ))
    }
}

fn guard(user: &Principal) -> Result<(), TimerError> {
    if user.role.can_control() {
        Ok(())
    } else {
        Err(TimerError::Forbidden)
    }
}

/// Fold the audit stamp into a write payload.
fn stamped(user: &Principal, mut fields: Value) -> Value {
    if let Value::Object(map) = &mut fields {
        map.insert("lastUpdatedBy".to_string(), json!(user));
        map.insert("lastUpdatedAt".to_string(), json!(SERVER_TIMESTAMP));
    }
    fields
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::auth::Role;
    use crate::store::MemoryDocStore;

    fn timer() -> TimerStore<MemoryDocStore> {
        TimerStore::new(Arc::new(MemoryDocStore::new()))
    }

    fn admin() -> Principal {
        Principal::new("admin-1", "admin@example.org", Role::Admin)
    }

    fn regent() -> Principal {
        Principal::new("regent-1", "regent@example.org", Role::Regent)
    }

    fn member() -> Principal {
        Principal::new("member-1", "member@example.org", Role::User)
    }

    /// Deadline arithmetic runs against the real clock, so comparisons
    /// allow a generous scheduling slop.
    fn assert_close(actual: i64, expected: i64) {
        assert!(
            (actual - expected).abs() <= 1_500,
            "expected ~{}, got {}",
            expected,
            actual
        );
    }

    fn assert_invariant(state: &TimerState) {
        assert_eq!(
            state.end_at.is_some(),
            state.is_running && !state.is_paused,
            "deadline/running invariant violated: {:?}",
            state
        );
        if state.is_paused {
            assert!(state.is_running, "paused timer must be running");
        }
    }

    #[tokio::test]
    async fn ensure_exists_creates_idle_baseline_once() {
        let timer = timer();
        let first = timer.ensure_exists().await.unwrap();
        assert_eq!(first.phase, Phase::Main);
        assert!(!first.is_running);
        assert!(!first.is_paused);
        assert_eq!(first.end_at, None);
        assert_eq!(first.main_duration_ms, 0);
        assert!(first.last_updated_at.is_some());

        let second = timer.ensure_exists().await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn ensure_exists_leaves_running_state_alone() {
        let timer = timer();
        timer.start(&admin(), 60_000, 30_000).await.unwrap();
        let state = timer.ensure_exists().await.unwrap();
        assert!(state.is_running);
    }

    #[tokio::test]
    async fn start_sets_main_phase_deadline_and_audit() {
        let timer = timer();
        timer.start(&admin(), 60_000, 30_000).await.unwrap();

        let state = timer.current().await.unwrap().unwrap();
        assert_eq!(state.phase, Phase::Main);
        assert!(state.is_running);
        assert!(!state.is_paused);
        assert_eq!(state.main_duration_ms, 60_000);
        assert_eq!(state.rotation_duration_ms, 30_000);
        assert_close(state.end_at.unwrap(), now_ms() + 60_000);
        assert_eq!(state.remaining_ms, None);
        assert_eq!(state.last_updated_by.unwrap().uid, "admin-1");
        assert_invariant(&timer.current().await.unwrap().unwrap());
    }

    #[tokio::test]
    async fn start_restarts_from_main_discarding_progress() {
        let timer = timer();
        timer.start(&admin(), 1_000, 2_000).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        timer.pause(&admin()).await.unwrap();

        timer.start(&regent(), 60_000, 30_000).await.unwrap();
        let state = timer.current().await.unwrap().unwrap();
        assert_eq!(state.phase, Phase::Main);
        assert!(!state.is_paused);
        assert_close(state.end_at.unwrap(), now_ms() + 60_000);
    }

    #[tokio::test]
    async fn start_requires_positive_durations() {
        let timer = timer();
        let err = timer.start(&admin(), 0, 5_000).await.unwrap_err();
        assert!(matches!(err, TimerError::InvalidArgument(_)));
        let err = timer.start(&admin(), 5_000, 0).await.unwrap_err();
        assert!(matches!(err, TimerError::InvalidArgument(_)));
        // Nothing was written.
        assert_eq!(timer.current().await.unwrap(), None);
    }

    #[tokio::test]
    async fn mutations_forbidden_for_plain_members() {
        let timer = timer();
        let user = member();
        assert!(matches!(
            timer.start(&user, 1_000, 2_000).await.unwrap_err(),
            TimerError::Forbidden
        ));
        assert!(matches!(
            timer.pause(&user).await.unwrap_err(),
            TimerError::Forbidden
        ));
        assert!(matches!(
            timer.resume(&user).await.unwrap_err(),
            TimerError::Forbidden
        ));
        assert!(matches!(
            timer.reset(&user).await.unwrap_err(),
            TimerError::Forbidden
        ));
        assert!(matches!(
            timer.set_durations(&user, 1, 1).await.unwrap_err(),
            TimerError::Forbidden
        ));
        assert!(matches!(
            timer.auto_switch_phase(&user).await.unwrap_err(),
            TimerError::Forbidden
        ));
        assert_eq!(timer.current().await.unwrap(), None);
    }

    #[tokio::test]
    async fn pause_captures_remaining_and_clears_deadline() {
        let timer = timer();
        timer.start(&admin(), 60_000, 30_000).await.unwrap();
        timer.pause(&admin()).await.unwrap();

        let state = timer.current().await.unwrap().unwrap();
        assert!(state.is_running);
        assert!(state.is_paused);
        assert_eq!(state.end_at, None);
        let remaining = state.remaining_ms.unwrap();
        assert!(
            (58_500..=60_000).contains(&remaining),
            "unexpected remaining: {}",
            remaining
        );
        assert_invariant(&state);
    }

    #[tokio::test]
    async fn pause_is_idempotent() {
        let timer = timer();
        timer.start(&admin(), 60_000, 30_000).await.unwrap();
        timer.pause(&admin()).await.unwrap();
        let first = timer.current().await.unwrap().unwrap();

        timer.pause(&admin()).await.unwrap();
        let second = timer.current().await.unwrap().unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn pause_is_noop_when_idle() {
        let timer = timer();
        timer.ensure_exists().await.unwrap();
        let before = timer.current().await.unwrap().unwrap();
        timer.pause(&admin()).await.unwrap();
        assert_eq!(timer.current().await.unwrap().unwrap(), before);
    }

    #[tokio::test]
    async fn resume_rebuilds_deadline_from_snapshot() {
        let timer = timer();
        timer.start(&admin(), 60_000, 30_000).await.unwrap();
        timer.pause(&admin()).await.unwrap();
        timer.resume(&admin()).await.unwrap();

        let state = timer.current().await.unwrap().unwrap();
        assert!(state.is_running);
        assert!(!state.is_paused);
        assert_eq!(state.remaining_ms, Some(0));
        assert_close(state.end_at.unwrap(), now_ms() + 60_000);
        assert_invariant(&state);
    }

    #[tokio::test]
    async fn resume_is_noop_when_not_paused() {
        let timer = timer();
        timer.start(&admin(), 60_000, 30_000).await.unwrap();
        let before = timer.current().await.unwrap().unwrap();
        timer.resume(&admin()).await.unwrap();
        assert_eq!(timer.current().await.unwrap().unwrap(), before);
    }

    #[tokio::test]
    async fn reset_returns_to_idle_keeping_durations() {
        let timer = timer();
        timer.start(&admin(), 60_000, 30_000).await.unwrap();
        timer.pause(&admin()).await.unwrap();
        timer.reset(&regent()).await.unwrap();

        let state = timer.current().await.unwrap().unwrap();
        assert!(!state.is_running);
        assert!(!state.is_paused);
        assert_eq!(state.end_at, None);
        assert_eq!(state.phase, Phase::Main);
        assert_eq!(state.main_duration_ms, 60_000);
        assert_eq!(state.rotation_duration_ms, 30_000);
        assert_eq!(state.remaining_ms, None);
        assert_eq!(state.last_updated_by.as_ref().unwrap().uid, "regent-1");
        assert_invariant(&state);
    }

    #[tokio::test]
    async fn set_durations_does_not_touch_running_state() {
        let timer = timer();
        timer.start(&admin(), 60_000, 30_000).await.unwrap();
        let end_at = timer.current().await.unwrap().unwrap().end_at;

        timer.set_durations(&admin(), 5_000, 6_000).await.unwrap();
        let state = timer.current().await.unwrap().unwrap();
        assert_eq!(state.main_duration_ms, 5_000);
        assert_eq!(state.rotation_duration_ms, 6_000);
        assert!(state.is_running);
        assert_eq!(state.end_at, end_at);
    }

    #[tokio::test]
    async fn set_durations_accepts_zero_before_first_start() {
        let timer = timer();
        timer.set_durations(&admin(), 0, 0).await.unwrap();
        let state = timer.current().await.unwrap().unwrap();
        assert_eq!(state.main_duration_ms, 0);
        assert!(!state.is_running);
    }

    #[tokio::test]
    async fn auto_switch_flips_phase_once_deadline_passes() {
        let timer = timer();
        timer.start(&admin(), 40, 2_000).await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;

        timer.auto_switch_phase(&admin()).await.unwrap();
        let state = timer.current().await.unwrap().unwrap();
        assert_eq!(state.phase, Phase::Rotation);
        assert_close(state.end_at.unwrap(), now_ms() + 2_000);
        assert_invariant(&state);

        // The deadline is now in the future again, so a racing second
        // attempt backs off.
        timer.auto_switch_phase(&regent()).await.unwrap();
        assert_eq!(
            timer.current().await.unwrap().unwrap().phase,
            Phase::Rotation
        );
    }

    #[tokio::test]
    async fn auto_switch_alternates_back_to_main() {
        let timer = timer();
        timer.start(&admin(), 40, 40).await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        timer.auto_switch_phase(&admin()).await.unwrap();
        assert_eq!(
            timer.current().await.unwrap().unwrap().phase,
            Phase::Rotation
        );

        tokio::time::sleep(Duration::from_millis(60)).await;
        timer.auto_switch_phase(&admin()).await.unwrap();
        let state = timer.current().await.unwrap().unwrap();
        assert_eq!(state.phase, Phase::Main);
        assert!(state.is_running);
    }

    #[tokio::test]
    async fn auto_switch_is_noop_before_deadline_and_when_paused() {
        let timer = timer();
        timer.start(&admin(), 60_000, 30_000).await.unwrap();
        let before = timer.current().await.unwrap().unwrap();
        timer.auto_switch_phase(&admin()).await.unwrap();
        assert_eq!(timer.current().await.unwrap().unwrap(), before);

        timer.start(&admin(), 40, 2_000).await.unwrap();
        timer.pause(&admin()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        let before = timer.current().await.unwrap().unwrap();
        timer.auto_switch_phase(&admin()).await.unwrap();
        assert_eq!(timer.current().await.unwrap().unwrap(), before);
    }

    #[tokio::test]
    async fn auto_switch_is_noop_when_idle_or_absent() {
        let timer = timer();
        timer.auto_switch_phase(&admin()).await.unwrap();
        assert_eq!(timer.current().await.unwrap(), None);

        timer.ensure_exists().await.unwrap();
        let before = timer.current().await.unwrap().unwrap();
        timer.auto_switch_phase(&admin()).await.unwrap();
        assert_eq!(timer.current().await.unwrap().unwrap(), before);
    }

    #[tokio::test]
    async fn invariant_holds_across_transition_sequences() {
        let timer = timer();
        let user = admin();

        timer.ensure_exists().await.unwrap();
        assert_invariant(&timer.current().await.unwrap().unwrap());

        timer.start(&user, 60_000, 30_000).await.unwrap();
        assert_invariant(&timer.current().await.unwrap().unwrap());

        timer.pause(&user).await.unwrap();
        assert_invariant(&timer.current().await.unwrap().unwrap());

        timer.resume(&user).await.unwrap();
        assert_invariant(&timer.current().await.unwrap().unwrap());

        timer.auto_switch_phase(&user).await.unwrap();
        assert_invariant(&timer.current().await.unwrap().unwrap());

        timer.reset(&user).await.unwrap();
        assert_invariant(&timer.current().await.unwrap().unwrap());
    }
}
