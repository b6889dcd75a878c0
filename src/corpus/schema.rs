// Corpus store schema: table creation.
//
// `schema_version` records the layout version a database file was created with.

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Layout version written by this release.
pub const SCHEMA_VERSION: i64 = 1;

/// Create all tables if they don't exist yet. Idempotent.
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Previously authored texts, one row per tweet
        CREATE TABLE IF NOT EXISTS tweets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            text TEXT NOT NULL,
            author TEXT NOT NULL,
            date TEXT NOT NULL DEFAULT '',      -- as imported, separators vary
            date_key TEXT,                      -- YYYY-MM-DD, NULL when unparseable
            sentiment TEXT,                     -- positive / neutral / negative
            sentiment_confidence REAL,          -- 0.0 to 1.0
            likes INTEGER,
            retweets INTEGER,
            topic TEXT,
            imported_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_tweets_author
            ON tweets(author COLLATE NOCASE);

        CREATE INDEX IF NOT EXISTS idx_tweets_topic
            ON tweets(topic COLLATE NOCASE);
        ",
    )
    .context("Failed to create corpus tables")?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [SCHEMA_VERSION],
    )?;

    Ok(())
}

/// Count the number of tables in the database (useful for init confirmation).
pub fn table_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}
