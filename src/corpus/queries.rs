// Corpus queries: all SQL touching the tweets table lives here.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, Row};

use super::models::{CorpusRecord, Sentiment};

/// Insert records in one transaction. Returns the number inserted.
pub fn insert_records(conn: &Connection, records: &[CorpusRecord]) -> Result<usize> {
    let tx = conn
        .unchecked_transaction()
        .context("Failed to start import transaction")?;

    {
        let mut stmt = tx.prepare(
            "INSERT INTO tweets
                (text, author, date, date_key, sentiment, sentiment_confidence, likes, retweets, topic)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )?;

        for record in records {
            let date_key = record.parsed_date().map(|d| d.format("%Y-%m-%d").to_string());
            stmt.execute(params![
                record.text,
                record.author,
                record.date,
                date_key,
                record.sentiment.map(|s| s.as_str()),
                record.sentiment_confidence,
                record.likes.map(count_to_sql),
                record.retweets.map(count_to_sql),
                record.topic,
            ])?;
        }
    }

    tx.commit().context("Failed to commit import transaction")?;
    Ok(records.len())
}

/// All records matching the optional author and topic filters, newest first.
///
/// Both filters are case-insensitive exact matches. Records with an
/// unparseable date sort after dated ones, in import order. An unknown
/// author yields an empty corpus.
pub fn fetch_corpus(
    conn: &Connection,
    author: Option<&str>,
    topic: Option<&str>,
) -> Result<Vec<CorpusRecord>> {
    let mut stmt = conn.prepare(
        "SELECT text, author, date, sentiment, sentiment_confidence, likes, retweets, topic
         FROM tweets
         WHERE (?1 IS NULL OR author = ?1 COLLATE NOCASE)
           AND (?2 IS NULL OR topic = ?2 COLLATE NOCASE)
         ORDER BY date_key IS NULL, date_key DESC, id ASC",
    )?;

    let rows = stmt.query_map(params![author, topic], record_from_row)?;

    let mut records = Vec::new();
    for row in rows {
        records.push(row?);
    }
    Ok(records)
}

/// Number of records per author, largest first.
pub fn author_counts(conn: &Connection) -> Result<Vec<(String, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT author, COUNT(*) AS n FROM tweets GROUP BY author ORDER BY n DESC, author ASC",
    )?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;

    let mut counts = Vec::new();
    for row in rows {
        counts.push(row?);
    }
    Ok(counts)
}

pub fn record_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM tweets", [], |row| row.get(0))?;
    Ok(count)
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<CorpusRecord> {
    let sentiment: Option<String> = row.get(3)?;
    let likes: Option<i64> = row.get(5)?;
    let retweets: Option<i64> = row.get(6)?;
    Ok(CorpusRecord {
        text: row.get(0)?,
        author: row.get(1)?,
        date: row.get(2)?,
        sentiment: sentiment.as_deref().and_then(Sentiment::parse),
        sentiment_confidence: row.get(4)?,
        likes: likes.map(count_from_sql),
        retweets: retweets.map(count_from_sql),
        topic: row.get(7)?,
    })
}

// SQLite integers are signed.
fn count_to_sql(count: u64) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

fn count_from_sql(count: i64) -> u64 {
    u64::try_from(count).unwrap_or(0)
}
