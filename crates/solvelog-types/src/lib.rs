//! solvelog-types: shared data types for the solved-problem tracker.
//!
//! Plain records exchanged between the store, the tracker service, the
//! reminder scheduler, and the channel layer. No I/O here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ──────────────────── Platforms ────────────────────

/// A judging platform whose problems can be logged.
///
/// Closed set; extending it means adding a variant plus a normalization
/// rule in the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    #[serde(rename = "atcoder")]
    AtCoder,
    #[serde(rename = "paiza")]
    Paiza,
}

impl Platform {
    /// Stable identifier used in the database and in command input.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::AtCoder => "atcoder",
            Platform::Paiza => "paiza",
        }
    }

    /// Human-facing name for replies and summaries.
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::AtCoder => "AtCoder",
            Platform::Paiza => "Paiza",
        }
    }

    /// All known platforms, in summary display order.
    pub fn all() -> &'static [Platform] {
        &[Platform::AtCoder, Platform::Paiza]
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for parsing a platform name from command input.
#[derive(Debug, thiserror::Error)]
#[error("unknown platform: {0}")]
pub struct UnknownPlatform(pub String);

impl std::str::FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "atcoder" => Ok(Platform::AtCoder),
            "paiza" => Ok(Platform::Paiza),
            other => Err(UnknownPlatform(other.to_string())),
        }
    }
}

// ──────────────────── Records ────────────────────

/// A solved-problem record as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolvedProblem {
    /// Store-assigned surrogate id, monotonically increasing.
    pub id: i64,
    /// Owning user.
    pub user_id: i64,
    pub platform: Platform,
    /// Normalized identifier, produced only by the tracker's normalizer.
    pub problem_id: String,
    /// Original URL for URL-backed platforms; None otherwise.
    pub url: Option<String>,
    /// Store-assigned insert instant, UTC.
    pub solved_at: DateTime<Utc>,
}

/// A user's reminder configuration, as loaded for one scheduler tick.
///
/// Both fields are raw strings from the store; the scheduler validates them
/// per tick so a bad row degrades to a per-user skip instead of a load error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderSetting {
    pub user_id: i64,
    /// Local wall-clock time of day, "HH:MM" (24h).
    pub time: String,
    /// IANA timezone name, e.g. "Asia/Tokyo".
    pub timezone: String,
}

// ──────────────────── Summaries ────────────────────

/// Per-platform solve count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformCount {
    pub platform: Platform,
    pub count: i64,
}

/// Summary of a user's activity: counts by platform plus recent solves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub counts: Vec<PlatformCount>,
    /// Newest first.
    pub recent: Vec<SolvedProblem>,
}

impl Summary {
    pub fn is_empty(&self) -> bool {
        self.recent.is_empty()
    }
}
