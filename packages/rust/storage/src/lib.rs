//! libSQL storage layer for events and task logs.
//!
//! The [`Storage`] struct wraps a local libSQL database holding the
//! deduplicated event records and the per-run execution log. Dedup is
//! enforced by a UNIQUE constraint on the content fingerprint; see
//! [`Storage::find_or_create`].

mod migrations;

use std::path::Path;

use chrono::{DateTime, Utc};
use libsql::{Connection, Database, params};
use uuid::Uuid;

use kyukou_shared::types::{Event, TaskLogEntry, TweetFlags, TweetKind};
use kyukou_shared::{KyukouError, Result};

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

impl Storage {
    /// Open or create a database at `path`, applying pending migrations.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| KyukouError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| KyukouError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| KyukouError::Storage(e.to_string()))?;

        let storage = Self { db, conn };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    KyukouError::Storage(format!(
                        "migration v{} failed: {e}",
                        migration.version
                    ))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    // -----------------------------------------------------------------------
    // Event operations
    // -----------------------------------------------------------------------

    /// Return the event stored under `candidate.hash`, or validate and
    /// persist `candidate`. The boolean reports whether a new record was
    /// created.
    ///
    /// The lookup is an optimization only: the insert is conditional on the
    /// UNIQUE hash constraint, and losing the lookup-then-insert race maps
    /// to the "already exists" outcome rather than an error. When the hash
    /// matches, the stored record wins even if other fields differ.
    pub async fn find_or_create(
        &self,
        candidate: &Event,
        now: DateTime<Utc>,
    ) -> Result<(Event, bool)> {
        if let Some(existing) = self.get_event(&candidate.hash).await? {
            return Ok((existing, false));
        }

        candidate.validate(now)?;

        let affected = self
            .conn
            .execute(
                "INSERT INTO events (id, raw, about, link, event_date, pub_date, period,
                                     department, subject, teacher, campus, room, note, hash,
                                     tweet_new, tweet_tomorrow, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
                 ON CONFLICT(hash) DO NOTHING",
                params![
                    Uuid::now_v7().to_string(),
                    candidate.raw.as_str(),
                    candidate.about.as_str(),
                    candidate.link.as_str(),
                    candidate.event_date.to_rfc3339(),
                    candidate.pub_date.to_rfc3339(),
                    candidate.period.as_str(),
                    candidate.department.as_str(),
                    candidate.subject.as_str(),
                    candidate.teacher.as_deref(),
                    candidate.campus.as_deref(),
                    candidate.room.as_deref(),
                    candidate.note.as_deref(),
                    candidate.hash.as_str(),
                    candidate.tweet.new as i64,
                    candidate.tweet.tomorrow as i64,
                    now.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| KyukouError::Storage(e.to_string()))?;

        if affected == 0 {
            // Lost a concurrent insert under the same hash; equivalent to
            // having found it in the first place.
            let existing = self.get_event(&candidate.hash).await?.ok_or_else(|| {
                KyukouError::Storage(format!(
                    "insert under hash {} conflicted but no row found",
                    candidate.hash
                ))
            })?;
            return Ok((existing, false));
        }

        Ok((candidate.clone(), true))
    }

    /// Exact-match lookup by content fingerprint.
    pub async fn get_event(&self, hash: &str) -> Result<Option<Event>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {EVENT_COLUMNS} FROM events WHERE hash = ?1"),
                params![hash],
            )
            .await
            .map_err(|e| KyukouError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_event(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(KyukouError::Storage(e.to_string())),
        }
    }

    /// List stored events, soonest event date first.
    pub async fn list_events(&self, limit: u32) -> Result<Vec<Event>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {EVENT_COLUMNS} FROM events ORDER BY event_date LIMIT ?1"
                ),
                params![limit],
            )
            .await
            .map_err(|e| KyukouError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_event(&row)?);
        }
        Ok(results)
    }

    /// List events whose given tweet flag is still unset, for the external
    /// notifier.
    pub async fn list_unannounced(&self, kind: TweetKind) -> Result<Vec<Event>> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE {} = 0 ORDER BY event_date",
            tweet_column(kind)
        );
        let mut rows = self
            .conn
            .query(&sql, params![])
            .await
            .map_err(|e| KyukouError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_event(&row)?);
        }
        Ok(results)
    }

    /// Flip one tweet flag. The only post-creation mutation events ever
    /// see, issued by the external notifier.
    pub async fn set_tweet_flag(&self, hash: &str, kind: TweetKind) -> Result<()> {
        let sql = format!("UPDATE events SET {} = 1 WHERE hash = ?1", tweet_column(kind));
        self.conn
            .execute(&sql, params![hash])
            .await
            .map_err(|e| KyukouError::Storage(e.to_string()))?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Task log operations
    // -----------------------------------------------------------------------

    /// Persist one task log entry.
    pub async fn insert_task_log(&self, entry: &TaskLogEntry) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO task_logs (id, message, level, time, elapsed_ms)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    Uuid::now_v7().to_string(),
                    entry.message.as_str(),
                    entry.level as i64,
                    entry.time.to_rfc3339(),
                    entry.elapsed_ms,
                ],
            )
            .await
            .map_err(|e| KyukouError::Storage(e.to_string()))?;
        Ok(())
    }

    /// List task log entries, most recent first.
    pub async fn list_task_logs(&self, limit: u32) -> Result<Vec<TaskLogEntry>> {
        let mut rows = self
            .conn
            .query(
                "SELECT message, level, time, elapsed_ms FROM task_logs
                 ORDER BY time DESC LIMIT ?1",
                params![limit],
            )
            .await
            .map_err(|e| KyukouError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(TaskLogEntry {
                message: row
                    .get::<String>(0)
                    .map_err(|e| KyukouError::Storage(e.to_string()))?,
                level: row
                    .get::<i64>(1)
                    .map_err(|e| KyukouError::Storage(e.to_string()))? as u8,
                time: parse_timestamp(
                    &row.get::<String>(2)
                        .map_err(|e| KyukouError::Storage(e.to_string()))?,
                )?,
                elapsed_ms: row
                    .get::<f64>(3)
                    .map_err(|e| KyukouError::Storage(e.to_string()))?,
            });
        }
        Ok(results)
    }
}

const EVENT_COLUMNS: &str = "raw, about, link, event_date, pub_date, period, department, \
                             subject, teacher, campus, room, note, hash, tweet_new, tweet_tomorrow";

fn tweet_column(kind: TweetKind) -> &'static str {
    match kind {
        TweetKind::New => "tweet_new",
        TweetKind::Tomorrow => "tweet_tomorrow",
    }
}

/// Convert a database row (in [`EVENT_COLUMNS`] order) to an [`Event`].
fn row_to_event(row: &libsql::Row) -> Result<Event> {
    let text = |i: i32| -> Result<String> {
        row.get::<String>(i)
            .map_err(|e| KyukouError::Storage(e.to_string()))
    };

    Ok(Event {
        raw: text(0)?,
        about: text(1)?,
        link: text(2)?,
        event_date: parse_timestamp(&text(3)?)?,
        pub_date: parse_timestamp(&text(4)?)?,
        period: text(5)?,
        department: text(6)?,
        subject: text(7)?,
        teacher: row.get::<String>(8).ok(),
        campus: row.get::<String>(9).ok(),
        room: row.get::<String>(10).ok(),
        note: row.get::<String>(11).ok(),
        hash: text(12)?,
        tweet: TweetFlags {
            new: row.get::<i64>(13).unwrap_or(0) != 0,
            tomorrow: row.get::<i64>(14).unwrap_or(0) != 0,
        },
    })
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| KyukouError::Storage(format!("invalid timestamp `{s}`: {e}")))
}
