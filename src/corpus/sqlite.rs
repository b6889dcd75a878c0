// SqliteCorpus: rusqlite backend implementing the CorpusStore trait.
//
// Connection is !Sync, so it lives behind tokio::sync::Mutex. Each method
// locks, runs the synchronous query from queries.rs, and returns; the guard
// is never held across an await.

use anyhow::Result;
use async_trait::async_trait;
use rusqlite::Connection;
use tokio::sync::Mutex;

use super::models::CorpusRecord;
use super::traits::CorpusStore;

pub struct SqliteCorpus {
    conn: Mutex<Connection>,
}

impl SqliteCorpus {
    /// Wrap an already-opened rusqlite Connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

#[async_trait]
impl CorpusStore for SqliteCorpus {
    async fn table_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::schema::table_count(&conn)
    }

    async fn record_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::queries::record_count(&conn)
    }

    async fn insert_records(&self, records: &[CorpusRecord]) -> Result<usize> {
        let conn = self.conn.lock().await;
        super::queries::insert_records(&conn, records)
    }

    async fn fetch_corpus(
        &self,
        author: Option<&str>,
        topic: Option<&str>,
    ) -> Result<Vec<CorpusRecord>> {
        let conn = self.conn.lock().await;
        super::queries::fetch_corpus(&conn, author, topic)
    }

    async fn author_counts(&self) -> Result<Vec<(String, i64)>> {
        let conn = self.conn.lock().await;
        super::queries::author_counts(&conn)
    }
}
