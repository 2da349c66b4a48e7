//! Live feed of timer document changes

use tracing::warn;

use crate::store::DocWatch;
use crate::timer::state::TimerState;

/// A subscription to the shared timer document.
///
/// Delivers the document contents at subscription time first (or `None` if
/// it has not been created yet), then every committed write in commit
/// order. Dropping the subscription, or calling
/// [`unsubscribe`](TimerSubscription::unsubscribe), stops delivery.
pub struct TimerSubscription {
    feed: DocWatch,
}

impl TimerSubscription {
    pub(crate) fn new(feed: DocWatch) -> Self {
        Self { feed }
    }

    /// Wait for the next document state. Returns `None` once the feed is
    /// closed. A document that no longer parses is reported as absent
    /// rather than tearing the feed down.
    pub async fn next(&mut self) -> Option<Option<TimerState>> {
        let doc = self.feed.next().await?;
        Some(doc.and_then(|value| match serde_json::from_value(value) {
            Ok(state) => Some(state),
            Err(e) => {
                warn!("ignoring malformed timer document: {}", e);
                None
            }
        }))
    }

    /// Tear the subscription down. Equivalent to dropping it.
    pub fn unsubscribe(self) {}
}
