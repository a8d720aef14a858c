//! solvelog-tracker: the service facade the command layer talks to.
//!
//! Wraps the activity store with identifier normalization, reminder-value
//! validation, and summary assembly. Presentation (Discord or otherwise)
//! maps the error taxonomy here onto user-facing replies.

pub mod normalize;

use std::sync::Arc;

use solvelog_reminder::matcher;
use solvelog_store::{ActivityStore, StoreError};
use solvelog_types::{Platform, SolvedProblem, Summary};

pub use normalize::{NormalizedId, normalize};

/// How many recent solves a summary includes.
pub const SUMMARY_RECENT_LIMIT: usize = 10;

/// How many recent solves a deletion listing offers.
pub const DELETE_LISTING_LIMIT: usize = 25;

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// The raw input does not match the platform's accepted shape.
    #[error("invalid identifier for {platform}: {input:?}")]
    InvalidIdentifier { platform: Platform, input: String },
    #[error("invalid reminder time {0:?}, expected HH:MM")]
    InvalidTime(String),
    #[error("unknown timezone {0:?}")]
    InvalidTimezone(String),
    /// The (user, problem) pair is already recorded.
    #[error("problem already recorded")]
    Duplicate,
    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for TrackerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate => TrackerError::Duplicate,
            other => TrackerError::Store(other),
        }
    }
}

impl From<matcher::ReminderConfigError> for TrackerError {
    fn from(e: matcher::ReminderConfigError) -> Self {
        match e {
            matcher::ReminderConfigError::InvalidTime(s) => TrackerError::InvalidTime(s),
            matcher::ReminderConfigError::InvalidTimezone(s) => TrackerError::InvalidTimezone(s),
        }
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;

/// Solved-problem tracking operations over the shared store.
pub struct Tracker {
    store: Arc<ActivityStore>,
}

impl Tracker {
    pub fn new(store: Arc<ActivityStore>) -> Self {
        Self { store }
    }

    /// Record a solve from raw command input.
    ///
    /// Normalizes first; only normalized identifiers ever reach the store.
    pub async fn log_problem(
        &self,
        user_id: i64,
        platform: Platform,
        raw: &str,
    ) -> Result<SolvedProblem> {
        let normalized =
            normalize(platform, raw).ok_or_else(|| TrackerError::InvalidIdentifier {
                platform,
                input: raw.to_string(),
            })?;

        let record = self
            .store
            .record_solved(
                user_id,
                platform,
                &normalized.problem_id,
                normalized.url.as_deref(),
            )
            .await?;

        tracing::info!(
            user_id,
            platform = %platform,
            problem_id = record.problem_id,
            "Recorded solve"
        );
        Ok(record)
    }

    /// Delete chosen problems. Absent ids are ignored; returns the number of
    /// rows actually removed.
    pub async fn delete_problems(
        &self,
        user_id: i64,
        platform: Platform,
        problem_ids: &[String],
    ) -> Result<usize> {
        let deleted = self.store.delete_solved(user_id, platform, problem_ids).await?;
        if deleted > 0 {
            tracing::info!(user_id, platform = %platform, deleted, "Deleted solves");
        }
        Ok(deleted)
    }

    /// Recent solves for one platform, newest first (for deletion pickers).
    pub async fn list_recent(
        &self,
        user_id: i64,
        platform: Platform,
        limit: usize,
    ) -> Result<Vec<SolvedProblem>> {
        Ok(self.store.list_recent(user_id, platform, limit).await?)
    }

    /// Per-platform counts plus the most recent solves across platforms.
    pub async fn summary(&self, user_id: i64) -> Result<Summary> {
        let counts = self.store.count_by_platform(user_id).await?;
        let recent = self
            .store
            .list_recent_all(user_id, SUMMARY_RECENT_LIMIT)
            .await?;
        Ok(Summary { counts, recent })
    }

    /// Configure the daily reminder. Values are validated with the same
    /// parsers the scheduler matches with, then written as a pair.
    pub async fn set_reminder(&self, user_id: i64, time: &str, timezone: &str) -> Result<()> {
        matcher::parse_reminder_time(time)?;
        matcher::parse_timezone(timezone)?;
        self.store.set_reminder(user_id, time, timezone).await?;
        tracing::info!(user_id, time, timezone, "Reminder configured");
        Ok(())
    }

    /// Drop the reminder configuration. Returns false when none was set.
    pub async fn clear_reminder(&self, user_id: i64) -> Result<bool> {
        Ok(self.store.clear_reminder(user_id).await?)
    }
}
