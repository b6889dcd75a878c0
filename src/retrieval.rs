// Context retrieval: find the corpus records closest to a query text.
//
// Per call: encode every corpus text in one batch, build a fresh exact L2
// index over the vectors, encode the query, take the k nearest, and map the
// positions back to records. Nothing is cached between calls; the index is
// owned by the call that built it.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::corpus::CorpusRecord;
use crate::encoder::TextEncoder;
use crate::error::{AttributionError, Result};
use crate::index::FlatL2Index;

/// Number of neighbors retrieved when the caller doesn't say otherwise.
pub const DEFAULT_TOP_K: usize = 5;

/// A retrieved record with its distance to the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextHit {
    pub record: CorpusRecord,
    pub distance: f32,
}

/// Hits ordered nearest first; length is `min(k, corpus.len())`.
pub type RetrievalResult = Vec<ContextHit>;

pub struct ContextRetriever {
    encoder: Arc<dyn TextEncoder>,
}

impl ContextRetriever {
    pub fn new(encoder: Arc<dyn TextEncoder>) -> Self {
        Self { encoder }
    }

    /// Retrieve the `k` records of `corpus` nearest to `query_text`.
    ///
    /// Preconditions are checked before the encoder is touched: an empty
    /// corpus is `EmptyCorpus`, a blank query or `k == 0` is `InvalidQuery`.
    pub async fn retrieve(
        &self,
        corpus: &[CorpusRecord],
        query_text: &str,
        k: usize,
    ) -> Result<RetrievalResult> {
        if corpus.is_empty() {
            return Err(AttributionError::EmptyCorpus);
        }
        if query_text.trim().is_empty() {
            return Err(AttributionError::InvalidQuery(
                "query text is empty".to_string(),
            ));
        }
        if k == 0 {
            return Err(AttributionError::InvalidQuery(
                "k must be at least 1".to_string(),
            ));
        }

        let texts: Vec<String> = corpus.iter().map(|r| r.text.clone()).collect();
        let vectors = self.encoder.encode(&texts).await?;
        if vectors.len() != corpus.len() {
            return Err(AttributionError::Encoding(format!(
                "encoder returned {} vectors for {} texts",
                vectors.len(),
                corpus.len()
            )));
        }

        let index = FlatL2Index::build(&vectors)?;
        let query = self.encoder.encode_one(query_text).await?;
        let neighbors = index.search(&query, k)?;

        let hits: RetrievalResult = neighbors
            .into_iter()
            .map(|n| ContextHit {
                record: corpus[n.position].clone(),
                distance: n.distance,
            })
            .collect();

        debug!(
            corpus_size = corpus.len(),
            k = k,
            returned = hits.len(),
            nearest = hits.first().map(|h| h.distance),
            "Retrieved context"
        );

        Ok(hits)
    }
}
