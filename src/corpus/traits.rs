// Corpus store trait: the collaborator that supplies records to analyze.
//
// The attribution pipeline only ever needs "all records for this author
// and/or topic". Keeping that behind a trait lets the CLI use the local
// SQLite store while a service embedding this crate can plug in its own
// graph store.

use anyhow::Result;
use async_trait::async_trait;

use super::models::CorpusRecord;

#[async_trait]
pub trait CorpusStore: Send + Sync {
    /// Count the number of user-created tables in the store.
    async fn table_count(&self) -> Result<i64>;

    /// Total number of stored records.
    async fn record_count(&self) -> Result<i64>;

    /// Append records, returning how many were stored.
    async fn insert_records(&self, records: &[CorpusRecord]) -> Result<usize>;

    /// All records matching the filters (None = no filter), newest first.
    /// An unknown author is an empty result, not an error.
    async fn fetch_corpus(
        &self,
        author: Option<&str>,
        topic: Option<&str>,
    ) -> Result<Vec<CorpusRecord>>;

    /// Record counts per author, largest first.
    async fn author_counts(&self) -> Result<Vec<(String, i64)>>;
}
