//! Trailing-window activity check.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use solvelog_store::ActivityStore;

/// Lookback window for "has solved anything recently".
///
/// A fixed trailing duration from the current instant, not aligned to the
/// user's local midnight.
pub const ACTIVITY_WINDOW_HOURS: i64 = 24;

/// Answers "has this user solved anything in the trailing 24 hours?".
pub struct ActivityChecker {
    store: Arc<ActivityStore>,
}

impl ActivityChecker {
    pub fn new(store: Arc<ActivityStore>) -> Self {
        Self { store }
    }

    /// True when at least one solve lies within `[now - 24h, now]`.
    /// The window edge is inclusive (a row exactly 24h old still counts).
    pub async fn is_active(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> solvelog_store::Result<bool> {
        let since = now - Duration::hours(ACTIVITY_WINDOW_HOURS);
        self.store.has_solved_since(user_id, since).await
    }
}
