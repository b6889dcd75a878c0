// Text encoder trait: the swap-ready abstraction for embeddings.
//
// The default implementation runs all-MiniLM-L6-v2 locally through ONNX.
// HashingEncoder is a model-free fallback for machines without the model
// files and for tests.

use async_trait::async_trait;

use crate::error::{AttributionError, Result};

/// A fixed-length embedding. Every vector produced by one encoder has the
/// same length, `TextEncoder::dimension()`.
pub type Embedding = Vec<f32>;

#[async_trait]
pub trait TextEncoder: Send + Sync {
    /// Length of every vector this encoder produces.
    fn dimension(&self) -> usize;

    /// Encode texts into vectors, one per input, in input order.
    ///
    /// Fails with `AttributionError::Encoding` when `texts` is empty.
    async fn encode(&self, texts: &[String]) -> Result<Vec<Embedding>>;

    /// Encode a single text through the same path as a batch.
    async fn encode_one(&self, text: &str) -> Result<Embedding> {
        let mut vectors = self.encode(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| AttributionError::Encoding("encoder returned no vector".to_string()))
    }
}
