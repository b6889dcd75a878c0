// Model-free feature-hashing encoder.
//
// Words and character trigrams are hashed into a fixed number of buckets
// and the counts are L2-normalized. Texts that share vocabulary land close
// together; identical texts map to identical vectors. It is far weaker than
// a sentence transformer but needs no model files, which makes it the
// fallback when the ONNX model isn't downloaded and the encoder of choice
// for tests.
//
// FNV-1a is used instead of std's DefaultHasher so vectors are stable across
// processes, Rust versions and platforms.

use async_trait::async_trait;

use super::l2_normalize;
use super::traits::{Embedding, TextEncoder};
use crate::error::{AttributionError, Result};

pub const DEFAULT_HASHING_DIM: usize = 256;

/// Words carry more signal than trigrams, so they count double.
const WORD_WEIGHT: f32 = 2.0;
const TRIGRAM_WEIGHT: f32 = 1.0;

#[derive(Debug, Clone)]
pub struct HashingEncoder {
    dim: usize,
}

impl HashingEncoder {
    /// Create an encoder with `dim` buckets. A zero dimension is bumped to 1.
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    /// Encode one text synchronously.
    pub fn embed(&self, text: &str) -> Embedding {
        let mut vector = vec![0.0_f32; self.dim];
        let normalized = text.to_lowercase();

        for word in normalized
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            vector[self.bucket(word.as_bytes())] += WORD_WEIGHT;

            let padded: Vec<char> = format!(" {word} ").chars().collect();
            for window in padded.windows(3) {
                let trigram: String = window.iter().collect();
                vector[self.bucket(trigram.as_bytes())] += TRIGRAM_WEIGHT;
            }
        }

        l2_normalize(&mut vector);
        vector
    }

    fn bucket(&self, bytes: &[u8]) -> usize {
        (fnv1a(bytes) % self.dim as u64) as usize
    }
}

impl Default for HashingEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_HASHING_DIM)
    }
}

#[async_trait]
impl TextEncoder for HashingEncoder {
    fn dimension(&self) -> usize {
        self.dim
    }

    async fn encode(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Err(AttributionError::Encoding(
                "cannot encode an empty batch".to_string(),
            ));
        }
        Ok(texts.iter().map(|t| self.embed(t)).collect())
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    bytes.iter().fold(OFFSET_BASIS, |hash, &b| {
        (hash ^ b as u64).wrapping_mul(PRIME)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn l2(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f32>().sqrt()
    }

    #[test]
    fn test_fnv1a_known_value() {
        // Reference value for the empty input is the offset basis.
        assert_eq!(fnv1a(b""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a(b"a"), 0xaf63_dc4c_8601_ec8c);
    }

    #[test]
    fn test_embed_is_deterministic_and_normalized() {
        let encoder = HashingEncoder::default();
        let a = encoder.embed("Healthcare reform matters");
        let b = encoder.embed("Healthcare reform matters");
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_embed_is_case_insensitive() {
        let encoder = HashingEncoder::default();
        assert_eq!(encoder.embed("Make America"), encoder.embed("make AMERICA"));
    }

    #[test]
    fn test_shared_vocabulary_is_closer() {
        let encoder = HashingEncoder::default();
        let query = encoder.embed("healthcare reform for every family");
        let related = encoder.embed("we passed healthcare reform");
        let unrelated = encoder.embed("crooked media witch hunt");
        assert!(l2(&query, &related) < l2(&query, &unrelated));
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let encoder = HashingEncoder::new(16);
        let v = encoder.embed("  ...  ");
        assert_eq!(v.len(), 16);
        assert!(v.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_zero_dimension_is_bumped() {
        assert_eq!(HashingEncoder::new(0).dimension(), 1);
    }

    #[tokio::test]
    async fn test_encode_rejects_empty_batch() {
        let encoder = HashingEncoder::default();
        let err = encoder.encode(&[]).await.unwrap_err();
        assert!(matches!(err, AttributionError::Encoding(_)));
    }

    #[tokio::test]
    async fn test_encode_preserves_order() {
        let encoder = HashingEncoder::default();
        let texts = vec!["first text".to_string(), "second one".to_string()];
        let vectors = encoder.encode(&texts).await.unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0], encoder.embed("first text"));
        assert_eq!(vectors[1], encoder.embed("second one"));
    }
}
