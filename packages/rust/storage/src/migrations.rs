//! SQL migration definitions for the kyukou database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a set of SQL statements executed within a transaction.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: events, task_logs",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Announced events, one row per deduplicated announcement.
-- The UNIQUE constraint on hash is the authoritative dedup guarantee;
-- the find-or-create lookup is only an optimization in front of it.
CREATE TABLE IF NOT EXISTS events (
    id             TEXT PRIMARY KEY,
    raw            TEXT NOT NULL,
    about          TEXT NOT NULL,
    link           TEXT NOT NULL,
    event_date     TEXT NOT NULL,
    pub_date       TEXT NOT NULL,
    period         TEXT NOT NULL,
    department     TEXT NOT NULL,
    subject        TEXT NOT NULL,
    teacher        TEXT,
    campus         TEXT,
    room           TEXT,
    note           TEXT,
    hash           TEXT NOT NULL UNIQUE,
    tweet_new      INTEGER NOT NULL DEFAULT 0,
    tweet_tomorrow INTEGER NOT NULL DEFAULT 0,
    created_at     TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_events_event_date ON events(event_date);

-- Execution log, one row per pipeline run.
CREATE TABLE IF NOT EXISTS task_logs (
    id         TEXT PRIMARY KEY,
    message    TEXT NOT NULL,
    level      INTEGER NOT NULL,
    time       TEXT NOT NULL,
    elapsed_ms REAL NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_task_logs_time ON task_logs(time);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
