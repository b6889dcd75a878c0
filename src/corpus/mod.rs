// Corpus layer: local SQLite store of previously authored texts.
//
// We use rusqlite with the "bundled" feature so there's no system SQLite
// dependency. The database file lives wherever QUILL_DB_PATH points
// (defaults to ./quill.db).

pub mod models;
pub mod queries;
pub mod schema;
pub mod sqlite;
pub mod traits;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use rusqlite::Connection;

pub use models::{CorpusRecord, Sentiment};
pub use traits::CorpusStore;

/// Open (or create) the database and create its tables.
pub fn initialize(db_path: &str) -> Result<Connection> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory for database: {}", db_path))?;
        }
    }

    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database at {}", db_path))?;

    conn.pragma_update(None, "journal_mode", "WAL")?;
    schema::create_tables(&conn)?;

    Ok(conn)
}

/// Open an existing database (fails if it doesn't exist yet).
pub fn open(db_path: &str) -> Result<Connection> {
    if !Path::new(db_path).exists() {
        anyhow::bail!("Database not found at {}. Run `quill init` first.", db_path);
    }

    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database at {}", db_path))?;

    conn.pragma_update(None, "journal_mode", "WAL")?;
    schema::create_tables(&conn)?;

    Ok(conn)
}

/// Create the SQLite store if needed and return it behind the trait.
pub fn initialize_sqlite(db_path: &str) -> Result<Arc<dyn CorpusStore>> {
    let conn = initialize(db_path)?;
    Ok(Arc::new(sqlite::SqliteCorpus::new(conn)))
}

/// Open an existing SQLite store behind the trait.
pub fn open_sqlite(db_path: &str) -> Result<Arc<dyn CorpusStore>> {
    let conn = open(db_path)?;
    Ok(Arc::new(sqlite::SqliteCorpus::new(conn)))
}

/// Read a JSON array of records from disk (the `quill import` format).
pub fn load_json_file(path: &Path) -> Result<Vec<CorpusRecord>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let records: Vec<CorpusRecord> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse corpus records from {}", path.display()))?;
    Ok(records)
}
