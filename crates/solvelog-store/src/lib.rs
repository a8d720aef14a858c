//! solvelog-store: SQLite persistence for solved-problem records and
//! per-user reminder configuration.
//!
//! The store is the sole owner of durable state. All methods are async
//! facades over a blocking SQLite connection; callers never hold live
//! database handles.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension};
use tokio::sync::Mutex;

use solvelog_types::{Platform, PlatformCount, ReminderSetting, SolvedProblem};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The (user_id, problem_id) pair already exists.
    #[error("problem already recorded")]
    Duplicate,
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Blocking task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, StoreError>;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        user_id INTEGER PRIMARY KEY,
        atcoder_id TEXT,
        reminder_time TEXT,
        reminder_tz TEXT
    );

    CREATE TABLE IF NOT EXISTS solved_problems (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        platform TEXT NOT NULL,
        problem_id TEXT NOT NULL,
        url TEXT,
        solved_at TEXT NOT NULL,
        FOREIGN KEY (user_id) REFERENCES users (user_id)
    );

    CREATE UNIQUE INDEX IF NOT EXISTS idx_user_problem
        ON solved_problems (user_id, problem_id);
";

/// Fixed-width UTC timestamp encoding so string comparison in SQL matches
/// chronological order.
fn encode_instant(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_instant(s: &str, col: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                col,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

fn row_to_solved(row: &rusqlite::Row<'_>) -> rusqlite::Result<SolvedProblem> {
    let platform_str: String = row.get(2)?;
    let platform: Platform = platform_str.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let solved_at_str: String = row.get(5)?;
    Ok(SolvedProblem {
        id: row.get(0)?,
        user_id: row.get(1)?,
        platform,
        problem_id: row.get(3)?,
        url: row.get(4)?,
        solved_at: decode_instant(&solved_at_str, 5)?,
    })
}

/// True when an insert failed on the (user_id, problem_id) unique index.
fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(inner, _)
            if inner.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// SQLite-backed activity store.
pub struct ActivityStore {
    conn: Arc<Mutex<Connection>>,
}

impl ActivityStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL for concurrent readers alongside the scheduler's writes
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        tracing::info!("Activity store opened: {}", path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    // ─── Users ───────────────────────────────────

    /// Ensure a user row exists. Idempotent.
    pub async fn upsert_user(&self, user_id: i64) -> Result<()> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.execute(
                "INSERT OR IGNORE INTO users (user_id) VALUES (?1)",
                rusqlite::params![user_id],
            )?;
            Ok(())
        })
        .await?
    }

    // ─── Solved problems ───────────────────────────────────

    /// Record a solved problem. The insert instant is assigned here.
    ///
    /// Duplicate detection rides on the unique index, not a pre-check, so
    /// two concurrent inserts cannot both succeed.
    pub async fn record_solved(
        &self,
        user_id: i64,
        platform: Platform,
        problem_id: &str,
        url: Option<&str>,
    ) -> Result<SolvedProblem> {
        self.record_solved_at(user_id, platform, problem_id, url, Utc::now())
            .await
    }

    /// Insert with an explicit instant. Backdated entries and deterministic
    /// tests go through here.
    pub async fn record_solved_at(
        &self,
        user_id: i64,
        platform: Platform,
        problem_id: &str,
        url: Option<&str>,
        solved_at: DateTime<Utc>,
    ) -> Result<SolvedProblem> {
        let conn = self.conn.clone();
        let problem_id = problem_id.to_string();
        let url = url.map(str::to_string);
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.execute(
                "INSERT OR IGNORE INTO users (user_id) VALUES (?1)",
                rusqlite::params![user_id],
            )?;
            let inserted = conn.execute(
                "INSERT INTO solved_problems (user_id, platform, problem_id, url, solved_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    user_id,
                    platform.as_str(),
                    problem_id,
                    url,
                    encode_instant(solved_at),
                ],
            );
            match inserted {
                Ok(_) => Ok(SolvedProblem {
                    id: conn.last_insert_rowid(),
                    user_id,
                    platform,
                    problem_id,
                    url,
                    solved_at,
                }),
                Err(e) if is_unique_violation(&e) => Err(StoreError::Duplicate),
                Err(e) => Err(e.into()),
            }
        })
        .await?
    }

    /// Delete the given problem ids for a user on one platform.
    ///
    /// Absent ids are ignored; returns how many rows were actually removed.
    pub async fn delete_solved(
        &self,
        user_id: i64,
        platform: Platform,
        problem_ids: &[String],
    ) -> Result<usize> {
        let conn = self.conn.clone();
        let problem_ids = problem_ids.to_vec();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let mut stmt = conn.prepare(
                "DELETE FROM solved_problems
                 WHERE user_id = ?1 AND platform = ?2 AND problem_id = ?3",
            )?;
            let mut deleted = 0;
            for problem_id in &problem_ids {
                deleted += stmt.execute(rusqlite::params![
                    user_id,
                    platform.as_str(),
                    problem_id
                ])?;
            }
            Ok(deleted)
        })
        .await?
    }

    /// Most recent solves for a user on one platform, newest first.
    ///
    /// Ties on `solved_at` break by id descending so the order is
    /// deterministic.
    pub async fn list_recent(
        &self,
        user_id: i64,
        platform: Platform,
        limit: usize,
    ) -> Result<Vec<SolvedProblem>> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let mut stmt = conn.prepare(
                "SELECT id, user_id, platform, problem_id, url, solved_at
                 FROM solved_problems
                 WHERE user_id = ?1 AND platform = ?2
                 ORDER BY solved_at DESC, id DESC
                 LIMIT ?3",
            )?;
            let rows = stmt
                .query_map(
                    rusqlite::params![user_id, platform.as_str(), limit as i64],
                    row_to_solved,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await?
    }

    /// Most recent solves across all platforms, newest first.
    pub async fn list_recent_all(&self, user_id: i64, limit: usize) -> Result<Vec<SolvedProblem>> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let mut stmt = conn.prepare(
                "SELECT id, user_id, platform, problem_id, url, solved_at
                 FROM solved_problems
                 WHERE user_id = ?1
                 ORDER BY solved_at DESC, id DESC
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![user_id, limit as i64], row_to_solved)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await?
    }

    /// Solve counts grouped by platform.
    pub async fn count_by_platform(&self, user_id: i64) -> Result<Vec<PlatformCount>> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let mut stmt = conn.prepare(
                "SELECT platform, COUNT(*) FROM solved_problems
                 WHERE user_id = ?1 GROUP BY platform ORDER BY platform",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![user_id], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let mut counts = Vec::with_capacity(rows.len());
            for (name, count) in rows {
                match name.parse::<Platform>() {
                    Ok(platform) => counts.push(PlatformCount { platform, count }),
                    Err(e) => tracing::warn!(user_id, "Skipping unknown platform row: {e}"),
                }
            }
            Ok(counts)
        })
        .await?
    }

    /// Existence check for activity at or after `since`.
    ///
    /// Boundary-inclusive: a row exactly at `since` counts. `SELECT EXISTS`
    /// short-circuits on the first hit.
    pub async fn has_solved_since(&self, user_id: i64, since: DateTime<Utc>) -> Result<bool> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let exists: bool = conn.query_row(
                "SELECT EXISTS (
                     SELECT 1 FROM solved_problems
                     WHERE user_id = ?1 AND solved_at >= ?2
                 )",
                rusqlite::params![user_id, encode_instant(since)],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
        .await?
    }

    // ─── Reminder configuration ───────────────────────────────────

    /// Set a user's reminder time and timezone. Upserts the user first.
    ///
    /// Validation of the values is the caller's job; the store only upholds
    /// the both-or-neither invariant by always writing the pair together.
    pub async fn set_reminder(&self, user_id: i64, time: &str, timezone: &str) -> Result<()> {
        let conn = self.conn.clone();
        let time = time.to_string();
        let timezone = timezone.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.execute(
                "INSERT OR IGNORE INTO users (user_id) VALUES (?1)",
                rusqlite::params![user_id],
            )?;
            conn.execute(
                "UPDATE users SET reminder_time = ?1, reminder_tz = ?2 WHERE user_id = ?3",
                rusqlite::params![time, timezone, user_id],
            )?;
            Ok(())
        })
        .await?
    }

    /// Remove a user's reminder configuration. Returns false if none was set.
    pub async fn clear_reminder(&self, user_id: i64) -> Result<bool> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let changed = conn.execute(
                "UPDATE users SET reminder_time = NULL, reminder_tz = NULL
                 WHERE user_id = ?1 AND reminder_time IS NOT NULL",
                rusqlite::params![user_id],
            )?;
            Ok(changed > 0)
        })
        .await?
    }

    /// All users with a complete reminder configuration.
    ///
    /// Scanned once per scheduler tick. Users with only one of the two
    /// columns set are excluded here, which is what keeps a half-configured
    /// row from ever matching.
    pub async fn list_users_with_reminder(&self) -> Result<Vec<ReminderSetting>> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let mut stmt = conn.prepare(
                "SELECT user_id, reminder_time, reminder_tz FROM users
                 WHERE reminder_time IS NOT NULL AND reminder_tz IS NOT NULL",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(ReminderSetting {
                        user_id: row.get(0)?,
                        time: row.get(1)?,
                        timezone: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await?
    }

    /// A user's reminder configuration, if complete.
    pub async fn get_reminder(&self, user_id: i64) -> Result<Option<ReminderSetting>> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let result = conn
                .query_row(
                    "SELECT user_id, reminder_time, reminder_tz FROM users
                     WHERE user_id = ?1
                       AND reminder_time IS NOT NULL AND reminder_tz IS NOT NULL",
                    rusqlite::params![user_id],
                    |row| {
                        Ok(ReminderSetting {
                            user_id: row.get(0)?,
                            time: row.get(1)?,
                            timezone: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            Ok(result)
        })
        .await?
    }
}
