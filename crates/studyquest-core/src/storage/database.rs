//! SQLite-based progress and session storage.
//!
//! Provides persistent storage for:
//! - Per-user level and in-level experience
//! - Finished study sessions (credited and rejected)
//! - Session statistics
//! - Key-value store for application state

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::data_dir;
use super::store::{NewSessionRecord, ProgressStore};
use crate::error::{DatabaseError, Result};
use crate::progression::UserProgress;

/// A session row read back from history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: i64,
    pub user_id: String,
    pub session_id: Uuid,
    pub duration_secs: u64,
    pub experience_gained: f64,
    pub before_level: u32,
    pub after_level: u32,
    pub rejected: bool,
    pub forced: bool,
    pub suspect_secs: f64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Stats {
    pub total_sessions: u64,
    pub rewarded_sessions: u64,
    pub rejected_sessions: u64,
    /// Credited study time only.
    pub total_study_secs: u64,
    pub total_experience: f64,
    pub today_study_secs: u64,
}

/// SQLite database for progress and session history.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data_dir>/studyquest.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory or database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        Self::open_at(data_dir()?.join("studyquest.db"))
    }

    /// Open (or create) the database at an explicit path.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS user_progress (
                    user_id     TEXT PRIMARY KEY,
                    level       INTEGER NOT NULL DEFAULT 1,
                    experience  REAL NOT NULL DEFAULT 0,
                    updated_at  TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS sessions (
                    id                INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id           TEXT NOT NULL,
                    session_id        TEXT NOT NULL UNIQUE,
                    duration_secs     INTEGER NOT NULL,
                    experience_gained REAL NOT NULL,
                    before_level      INTEGER NOT NULL,
                    after_level       INTEGER NOT NULL,
                    rejected          INTEGER NOT NULL DEFAULT 0,
                    forced            INTEGER NOT NULL DEFAULT 0,
                    suspect_secs      REAL NOT NULL DEFAULT 0,
                    started_at        TEXT NOT NULL,
                    ended_at          TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS kv (
                    key   TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_sessions_user_ended ON sessions(user_id, ended_at);",
            )
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))
    }

    /// Most recent sessions first.
    pub fn recent_sessions(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<SessionRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, session_id, duration_secs, experience_gained,
                    before_level, after_level, rejected, forced, suspect_secs,
                    started_at, ended_at
             FROM sessions
             WHERE user_id = ?1
             ORDER BY ended_at DESC, id DESC
             LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![user_id, limit as i64], |row| {
            Ok(RawSessionRow {
                id: row.get(0)?,
                user_id: row.get(1)?,
                session_id: row.get(2)?,
                duration_secs: row.get(3)?,
                experience_gained: row.get(4)?,
                before_level: row.get(5)?,
                after_level: row.get(6)?,
                rejected: row.get(7)?,
                forced: row.get(8)?,
                suspect_secs: row.get(9)?,
                started_at: row.get(10)?,
                ended_at: row.get(11)?,
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?.decode()?);
        }
        Ok(records)
    }

    /// Aggregate history for one user. `now` decides what counts as today (UTC).
    pub fn stats(&self, user_id: &str, now: DateTime<Utc>) -> Result<Stats, DatabaseError> {
        let (total, rejected, study_secs, experience) = self.conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(rejected), 0),
                    COALESCE(SUM(CASE WHEN rejected = 0 THEN duration_secs ELSE 0 END), 0),
                    COALESCE(SUM(experience_gained), 0.0)
             FROM sessions
             WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok((
                    row.get::<_, u64>(0)?,
                    row.get::<_, u64>(1)?,
                    row.get::<_, u64>(2)?,
                    row.get::<_, f64>(3)?,
                ))
            },
        )?;

        let today = now.format("%Y-%m-%d").to_string();
        let today_study_secs = self.conn.query_row(
            "SELECT COALESCE(SUM(duration_secs), 0)
             FROM sessions
             WHERE user_id = ?1 AND rejected = 0 AND ended_at >= ?2",
            params![user_id, format!("{today}T00:00:00+00:00")],
            |row| row.get::<_, u64>(0),
        )?;

        Ok(Stats {
            total_sessions: total,
            rewarded_sessions: total.saturating_sub(rejected),
            rejected_sessions: rejected,
            total_study_secs: study_secs,
            total_experience: experience,
            today_study_secs,
        })
    }

    /// Distinct UTC days with at least one credited session, ascending.
    pub fn study_days(&self, user_id: &str) -> Result<Vec<NaiveDate>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT substr(ended_at, 1, 10)
             FROM sessions
             WHERE user_id = ?1 AND rejected = 0
             ORDER BY 1",
        )?;
        let rows = stmt.query_map(params![user_id], |row| row.get::<_, String>(0))?;

        let mut days = Vec::new();
        for row in rows {
            let raw = row?;
            let day =
                NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|e| corrupt("sessions", e))?;
            days.push(day);
        }
        Ok(days)
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

impl ProgressStore for Database {
    fn load_user_progress(&self, user_id: &str) -> Result<UserProgress, DatabaseError> {
        self.conn.execute(
            "INSERT OR IGNORE INTO user_progress (user_id, level, experience, updated_at)
             VALUES (?1, 1, 0, ?2)",
            params![user_id, Utc::now().to_rfc3339()],
        )?;
        let progress = self.conn.query_row(
            "SELECT level, experience FROM user_progress WHERE user_id = ?1",
            params![user_id],
            |row| Ok(UserProgress::new(row.get(0)?, row.get(1)?)),
        )?;
        Ok(progress)
    }

    fn save_user_progress(
        &self,
        user_id: &str,
        progress: &UserProgress,
    ) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO user_progress (user_id, level, experience, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id) DO UPDATE SET
                level = excluded.level,
                experience = excluded.experience,
                updated_at = excluded.updated_at",
            params![user_id, progress.level, progress.experience, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn append_session_record(&self, record: &NewSessionRecord) -> Result<i64, DatabaseError> {
        self.conn.execute(
            "INSERT INTO sessions (user_id, session_id, duration_secs, experience_gained,
                                   before_level, after_level, rejected, forced, suspect_secs,
                                   started_at, ended_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                record.user_id,
                record.session_id.to_string(),
                record.duration_secs,
                record.experience_gained,
                record.before_level,
                record.after_level,
                record.rejected,
                record.forced,
                record.suspect_secs,
                record.started_at.to_rfc3339(),
                record.ended_at.to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }
}

struct RawSessionRow {
    id: i64,
    user_id: String,
    session_id: String,
    duration_secs: u64,
    experience_gained: f64,
    before_level: u32,
    after_level: u32,
    rejected: bool,
    forced: bool,
    suspect_secs: f64,
    started_at: String,
    ended_at: String,
}

impl RawSessionRow {
    fn decode(self) -> Result<SessionRecord, DatabaseError> {
        Ok(SessionRecord {
            id: self.id,
            user_id: self.user_id,
            session_id: Uuid::parse_str(&self.session_id).map_err(|e| corrupt("sessions", e))?,
            duration_secs: self.duration_secs,
            experience_gained: self.experience_gained,
            before_level: self.before_level,
            after_level: self.after_level,
            rejected: self.rejected,
            forced: self.forced,
            suspect_secs: self.suspect_secs,
            started_at: parse_timestamp(&self.started_at)?,
            ended_at: parse_timestamp(&self.ended_at)?,
        })
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| corrupt("sessions", e))
}

fn corrupt(table: &str, err: impl std::fmt::Display) -> DatabaseError {
    DatabaseError::CorruptRecord {
        table: table.to_string(),
        message: err.to_string(),
    }
}
