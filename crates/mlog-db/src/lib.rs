//! Storage layer for mlog.
//!
//! Persists completed buckets using `rusqlite` and implements
//! [`mlog_core::BucketStore`].
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! A `Database` can be moved between threads but must be wrapped in a `Mutex`
//! to be shared, which is what the HTTP service does.
//!
//! # Schema
//!
//! Three append-only tables linked by reference:
//! - `buckets`: one row per flushed bucket, `opened_at` as Unix epoch seconds
//! - `app_groups`: one row per application within a bucket
//! - `window_durations`: one row per window label within a group
//!
//! Row IDs of `app_groups` and `window_durations` increase in insertion order,
//! which is how first-seen order is restored on read.

use std::path::Path;

use chrono::{DateTime, Utc};
use mlog_core::{Bucket, BucketId, BucketStore, EmptyBucketId, StoreError};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A duration does not fit in an SQLite integer.
    #[error("duration of window '{label}' is too large to store: {secs}s")]
    DurationOverflow { label: String, secs: u64 },
    /// A stored row could not be turned back into a bucket.
    #[error("invalid row for bucket {bucket_id}: {message}")]
    InvalidRow { bucket_id: String, message: String },
}

impl From<EmptyBucketId> for DbError {
    fn from(err: EmptyBucketId) -> Self {
        Self::InvalidRow {
            bucket_id: String::new(),
            message: err.to_string(),
        }
    }
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS buckets (
                id TEXT PRIMARY KEY,
                opened_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_buckets_opened_at ON buckets(opened_at);

            CREATE TABLE IF NOT EXISTS app_groups (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                bucket_id TEXT NOT NULL,
                application TEXT NOT NULL,
                UNIQUE (bucket_id, application),
                FOREIGN KEY (bucket_id) REFERENCES buckets(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_app_groups_bucket ON app_groups(bucket_id);

            -- duration_secs: accumulated seconds for one (application, label) pair
            CREATE TABLE IF NOT EXISTS window_durations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                group_id INTEGER NOT NULL,
                label TEXT NOT NULL,
                duration_secs INTEGER NOT NULL CHECK (duration_secs >= 0),
                UNIQUE (group_id, label),
                FOREIGN KEY (group_id) REFERENCES app_groups(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_window_durations_group ON window_durations(group_id);
            ",
        )?;
        Ok(())
    }

    /// Stores a bucket with all its groups and windows in one transaction.
    ///
    /// Fails without writing anything if the bucket ID is already stored.
    pub fn insert_bucket(&mut self, bucket: &Bucket) -> Result<(), DbError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO buckets (id, opened_at) VALUES (?, ?)",
            params![bucket.id().as_str(), bucket.opened_at().timestamp()],
        )?;
        {
            let mut group_stmt =
                tx.prepare("INSERT INTO app_groups (bucket_id, application) VALUES (?, ?)")?;
            let mut window_stmt = tx.prepare(
                "INSERT INTO window_durations (group_id, label, duration_secs) VALUES (?, ?, ?)",
            )?;
            for group in bucket.groups() {
                let group_id =
                    group_stmt.insert(params![bucket.id().as_str(), group.application()])?;
                for window in group.windows() {
                    let secs = i64::try_from(window.duration_secs).map_err(|_| {
                        DbError::DurationOverflow {
                            label: window.label.clone(),
                            secs: window.duration_secs,
                        }
                    })?;
                    window_stmt.execute(params![group_id, window.label, secs])?;
                }
            }
        }
        tx.commit()?;
        tracing::debug!(
            bucket_id = %bucket.id(),
            groups = bucket.groups().len(),
            "stored bucket"
        );
        Ok(())
    }

    /// Lists buckets with `start <= opened_at <= end` (epoch seconds),
    /// oldest first.
    pub fn list_buckets_in_range(&self, start: i64, end: i64) -> Result<Vec<Bucket>, DbError> {
        if end < start {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn.prepare(
            "
            SELECT b.id, b.opened_at, g.application, w.label, w.duration_secs
            FROM buckets b
            LEFT JOIN app_groups g ON g.bucket_id = b.id
            LEFT JOIN window_durations w ON w.group_id = g.id
            WHERE b.opened_at >= ? AND b.opened_at <= ?
            ORDER BY b.opened_at ASC, b.id ASC, g.id ASC, w.id ASC
            ",
        )?;
        let rows = stmt.query_map(params![start, end], |row| {
            Ok(BucketRow {
                bucket_id: row.get(0)?,
                opened_at: row.get(1)?,
                application: row.get(2)?,
                label: row.get(3)?,
                duration_secs: row.get(4)?,
            })
        })?;

        let mut buckets: Vec<Bucket> = Vec::new();
        for row in rows {
            let row = row?;
            let same_bucket = buckets
                .last()
                .is_some_and(|b| b.id().as_str() == row.bucket_id);
            if !same_bucket {
                buckets.push(row.open_bucket()?);
            }
            let Some(bucket) = buckets.last_mut() else {
                continue;
            };
            row.apply_to(bucket)?;
        }
        Ok(buckets)
    }

    /// Number of stored buckets.
    pub fn count_buckets(&self) -> Result<u64, DbError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM buckets", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// `opened_at` of the most recent bucket, if any.
    pub fn last_bucket_opened_at(&self) -> Result<Option<DateTime<Utc>>, DbError> {
        let epoch: Option<i64> = self
            .conn
            .query_row(
                "SELECT opened_at FROM buckets ORDER BY opened_at DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(epoch.and_then(|e| DateTime::from_timestamp(e, 0)))
    }
}

/// One row of the bucket/group/window join.
struct BucketRow {
    bucket_id: String,
    opened_at: i64,
    application: Option<String>,
    label: Option<String>,
    duration_secs: Option<i64>,
}

impl BucketRow {
    fn invalid(&self, message: impl Into<String>) -> DbError {
        DbError::InvalidRow {
            bucket_id: self.bucket_id.clone(),
            message: message.into(),
        }
    }

    fn open_bucket(&self) -> Result<Bucket, DbError> {
        let id = BucketId::new(self.bucket_id.clone())?;
        let opened_at = DateTime::from_timestamp(self.opened_at, 0)
            .ok_or_else(|| self.invalid(format!("opened_at out of range: {}", self.opened_at)))?;
        Ok(Bucket::with_id(id, opened_at))
    }

    fn apply_to(&self, bucket: &mut Bucket) -> Result<(), DbError> {
        let Some(application) = &self.application else {
            return Ok(());
        };
        let group = bucket.group_mut(application);
        if let (Some(label), Some(secs)) = (&self.label, self.duration_secs) {
            let secs = u64::try_from(secs)
                .map_err(|_| self.invalid(format!("negative duration for '{label}'")))?;
            group.add(label, secs);
        }
        Ok(())
    }
}

impl BucketStore for Database {
    fn append(&mut self, bucket: &Bucket) -> Result<(), StoreError> {
        self.insert_bucket(bucket)
            .map_err(|e| StoreError::AppendFailed {
                bucket_id: bucket.id().clone(),
                source: Box::new(e),
            })
    }

    fn fetch_range(&self, start_epoch: i64, end_epoch: i64) -> Result<Vec<Bucket>, StoreError> {
        self.list_buckets_in_range(start_epoch, end_epoch)
            .map_err(|e| StoreError::FetchFailed {
                start_epoch,
                end_epoch,
                source: Box::new(e),
            })
    }
}
