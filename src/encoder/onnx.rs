// Sentence embeddings with all-MiniLM-L6-v2 running locally via ONNX.
//
// Each text is tokenized, run through the BERT encoder, mean-pooled over the
// attention mask and L2-normalized, which is what the sentence-transformers
// pipeline for this model does. Normalized vectors keep Euclidean distance
// monotonic in cosine similarity, so the exact L2 index ranks semantically.
//
// Loading the session is the expensive part (a few hundred ms, ~90 MB on
// disk); construct one SentenceEncoder per process and share it.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use async_trait::async_trait;
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::{Tokenizer, TruncationStrategy};
use tracing::debug;

use super::l2_normalize;
use super::traits::{Embedding, TextEncoder};
use crate::error::{AttributionError, Result};

/// Embedding dimension for all-MiniLM-L6-v2.
pub const EMBEDDING_DIM: usize = 384;

/// sentence-transformers' max_seq_length for all-MiniLM-L6-v2.
pub const ENCODER_MAX_TOKENS: usize = 256;

/// Sentence encoder backed by a local ONNX session.
///
/// ort::Session::run takes &mut self and spawn_blocking needs 'static data,
/// hence Arc<Mutex<Session>> and Arc<Tokenizer>.
pub struct SentenceEncoder {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
}

impl SentenceEncoder {
    /// Load the embedding model and tokenizer from the given directory.
    ///
    /// Expects `model.onnx` and `tokenizer.json` in the directory.
    /// Run `quill download-model` first if they don't exist.
    pub fn load(model_dir: &Path) -> anyhow::Result<Self> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        if !model_path.exists() {
            anyhow::bail!(
                "Embedding model not found: {}\nRun `quill download-model` to download it.",
                model_path.display()
            );
        }
        if !tokenizer_path.exists() {
            anyhow::bail!(
                "Embedding tokenizer not found: {}\nRun `quill download-model` to download it.",
                tokenizer_path.display()
            );
        }

        let session = Session::builder()
            .context("Failed to create ONNX session builder")?
            .commit_from_file(&model_path)
            .with_context(|| {
                format!(
                    "Failed to load embedding model from {}",
                    model_path.display()
                )
            })?;

        let tokenizer = crate::models::load_tokenizer(
            &tokenizer_path,
            ENCODER_MAX_TOKENS,
            TruncationStrategy::LongestFirst,
        )?;

        debug!("Loaded sentence embedding model from {}", model_dir.display());

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
        })
    }
}

#[async_trait]
impl TextEncoder for SentenceEncoder {
    fn dimension(&self) -> usize {
        EMBEDDING_DIM
    }

    async fn encode(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Err(AttributionError::Encoding(
                "cannot encode an empty batch".to_string(),
            ));
        }

        let session = Arc::clone(&self.session);
        let tokenizer = Arc::clone(&self.tokenizer);
        let texts = texts.to_vec();

        tokio::task::spawn_blocking(move || embed_sync(&session, &tokenizer, &texts))
            .await
            .map_err(|e| AttributionError::Encoding(format!("embedding task panicked: {e}")))?
            .map_err(|e| AttributionError::Encoding(format!("{e:#}")))
    }
}

/// Tokenize, run inference, mean-pool and normalize. Runs on a blocking thread.
fn embed_sync(
    session: &Mutex<Session>,
    tokenizer: &Tokenizer,
    texts: &[String],
) -> anyhow::Result<Vec<Embedding>> {
    let encodings: Vec<_> = texts
        .iter()
        .map(|t| {
            tokenizer
                .encode(t.as_str(), true)
                .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let batch_size = encodings.len();
    let max_len = encodings
        .iter()
        .map(|e| e.get_ids().len())
        .max()
        .unwrap_or(0);

    if max_len == 0 {
        return Ok(vec![vec![0.0; EMBEDDING_DIM]; batch_size]);
    }

    // BERT inputs, right-padded with token id 0 and mask 0.
    let mut input_ids_flat: Vec<i64> = Vec::with_capacity(batch_size * max_len);
    let mut attention_mask_flat: Vec<i64> = Vec::with_capacity(batch_size * max_len);
    let mut token_type_ids_flat: Vec<i64> = Vec::with_capacity(batch_size * max_len);

    for enc in &encodings {
        let ids = enc.get_ids();
        let mask = enc.get_attention_mask();
        let pad_len = max_len - ids.len();

        input_ids_flat.extend(ids.iter().map(|&id| id as i64));
        attention_mask_flat.extend(mask.iter().map(|&m| m as i64));
        token_type_ids_flat.extend(std::iter::repeat_n(0i64, ids.len()));

        input_ids_flat.extend(std::iter::repeat_n(0i64, pad_len));
        attention_mask_flat.extend(std::iter::repeat_n(0i64, pad_len));
        token_type_ids_flat.extend(std::iter::repeat_n(0i64, pad_len));
    }

    let shape = [batch_size as i64, max_len as i64];

    let input_ids_tensor =
        Tensor::from_array((shape, input_ids_flat)).context("Failed to create input_ids tensor")?;
    let attention_mask_tensor = Tensor::from_array((shape, attention_mask_flat.clone()))
        .context("Failed to create attention_mask tensor")?;
    let token_type_ids_tensor = Tensor::from_array((shape, token_type_ids_flat))
        .context("Failed to create token_type_ids tensor")?;

    // last_hidden_state: [batch, seq_len, 384]
    let hidden_states = {
        let mut session = session
            .lock()
            .map_err(|e| anyhow::anyhow!("Session lock poisoned: {}", e))?;

        let outputs = session
            .run(ort::inputs! {
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor,
                "token_type_ids" => token_type_ids_tensor
            })
            .context("Embedding ONNX inference failed")?;

        let (_shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .context("Failed to extract embedding output tensor")?;

        data.to_vec()
    };

    if hidden_states.len() != batch_size * max_len * EMBEDDING_DIM {
        anyhow::bail!(
            "Unexpected embedding output size {} for batch {}x{}x{}",
            hidden_states.len(),
            batch_size,
            max_len,
            EMBEDDING_DIM
        );
    }

    let embeddings: Vec<Embedding> = (0..batch_size)
        .map(|i| {
            let mask = &attention_mask_flat[i * max_len..(i + 1) * max_len];
            let tokens = &hidden_states[i * max_len * EMBEDDING_DIM..(i + 1) * max_len * EMBEDDING_DIM];
            let mut pooled = mean_pool(tokens, mask);
            l2_normalize(&mut pooled);
            pooled
        })
        .collect();

    debug!(
        batch_size = batch_size,
        dim = EMBEDDING_DIM,
        "Computed sentence embeddings"
    );

    Ok(embeddings)
}

/// Average token vectors weighted by the attention mask.
///
/// `tokens` is `mask.len()` rows of EMBEDDING_DIM floats. Accumulates in f64
/// to keep long sequences from drifting.
fn mean_pool(tokens: &[f32], mask: &[i64]) -> Embedding {
    let mut sum = vec![0.0_f64; EMBEDDING_DIM];
    let mut mask_sum = 0.0_f64;

    for (j, &m) in mask.iter().enumerate() {
        if m > 0 {
            let weight = m as f64;
            mask_sum += weight;
            let row = &tokens[j * EMBEDDING_DIM..(j + 1) * EMBEDDING_DIM];
            for (acc, &val) in sum.iter_mut().zip(row) {
                *acc += val as f64 * weight;
            }
        }
    }

    if mask_sum > 0.0 {
        for val in &mut sum {
            *val /= mask_sum;
        }
    }

    sum.into_iter().map(|v| v as f32).collect()
}
