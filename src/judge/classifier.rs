// Zero-shot classification with a natural-language-inference model.
//
// For every candidate label the input sequence is paired (as premise) with
// the hypothesis "This example is {label}." and run through the NLI model.
// The entailment logits of all pairs are softmaxed against each other, so
// the scores form a distribution over the candidate labels. This is the
// standard single-label zero-shot recipe.
//
// The default model is facebook/bart-large-mnli exported to ONNX, whose
// output classes are [contradiction, neutral, entailment].

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use async_trait::async_trait;
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::{Tokenizer, TruncationStrategy};
use tracing::debug;

use crate::error::{AttributionError, Result};

/// Number of output classes of an MNLI head.
const NLI_CLASSES: usize = 3;

/// Index of the entailment class in the model output.
const ENTAILMENT_INDEX: usize = 2;

/// BART pad token id.
const PAD_TOKEN_ID: i64 = 1;

/// bart-large-mnli position limit. Only the premise is clipped, so the
/// hypothesis always survives intact.
pub const NLI_MAX_TOKENS: usize = 1024;

/// A candidate label and its share of the probability mass.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelScore {
    pub label: String,
    /// 0.0 to 1.0; scores of one call sum to 1.
    pub score: f64,
}

#[async_trait]
pub trait ZeroShotClassifier: Send + Sync {
    /// Score `sequence` against `labels`, highest score first.
    async fn classify(&self, sequence: &str, labels: &[String]) -> Result<Vec<LabelScore>>;
}

/// The hypothesis paired with the sequence for a candidate label.
pub fn hypothesis_for(label: &str) -> String {
    format!("This example is {label}.")
}

/// Numerically stable softmax.
pub fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Turn per-label entailment logits into a ranked distribution.
/// Ties keep the caller's label order.
pub fn rank_labels(labels: &[String], entailment_logits: &[f64]) -> Vec<LabelScore> {
    let mut ranked: Vec<LabelScore> = labels
        .iter()
        .zip(softmax(entailment_logits))
        .map(|(label, score)| LabelScore {
            label: label.clone(),
            score,
        })
        .collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked
}

/// Local ONNX NLI classifier.
pub struct OnnxNliClassifier {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
}

impl OnnxNliClassifier {
    /// Load the NLI model and tokenizer from the given directory.
    ///
    /// Expects `model.onnx` and `tokenizer.json` in the directory.
    /// Run `quill download-model` first if they don't exist.
    pub fn load(model_dir: &Path) -> anyhow::Result<Self> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        if !model_path.exists() {
            anyhow::bail!(
                "NLI model not found: {}\nRun `quill download-model` to download it.",
                model_path.display()
            );
        }
        if !tokenizer_path.exists() {
            anyhow::bail!(
                "NLI tokenizer not found: {}\nRun `quill download-model` to download it.",
                tokenizer_path.display()
            );
        }

        let session = Session::builder()
            .context("Failed to create ONNX session builder")?
            .commit_from_file(&model_path)
            .with_context(|| format!("Failed to load NLI model from {}", model_path.display()))?;

        let tokenizer = crate::models::load_tokenizer(
            &tokenizer_path,
            NLI_MAX_TOKENS,
            TruncationStrategy::OnlyFirst,
        )?;

        debug!("Loaded zero-shot NLI model from {}", model_dir.display());

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
        })
    }
}

#[async_trait]
impl ZeroShotClassifier for OnnxNliClassifier {
    async fn classify(&self, sequence: &str, labels: &[String]) -> Result<Vec<LabelScore>> {
        if labels.is_empty() {
            return Err(AttributionError::Classification(
                "at least one candidate label is required".to_string(),
            ));
        }

        let session = Arc::clone(&self.session);
        let tokenizer = Arc::clone(&self.tokenizer);
        let sequence = sequence.to_string();
        let labels = labels.to_vec();

        let entailment = tokio::task::spawn_blocking(move || {
            entailment_logits(&session, &tokenizer, &sequence, &labels)
                .map(|logits| (labels, logits))
        })
        .await
        .map_err(|e| AttributionError::Classification(format!("NLI task panicked: {e}")))?
        .map_err(|e| AttributionError::Classification(format!("{e:#}")))?;

        let (labels, logits) = entailment;
        Ok(rank_labels(&labels, &logits))
    }
}

/// Run one (premise, hypothesis) pair per label through the model and return
/// the entailment logit of each pair, in label order.
fn entailment_logits(
    session: &Mutex<Session>,
    tokenizer: &Tokenizer,
    sequence: &str,
    labels: &[String],
) -> anyhow::Result<Vec<f64>> {
    let encodings: Vec<_> = labels
        .iter()
        .map(|label| {
            let hypothesis = hypothesis_for(label);
            tokenizer
                .encode((sequence, hypothesis.as_str()), true)
                .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let batch_size = encodings.len();
    let max_len = encodings.iter().map(|e| e.get_ids().len()).max().unwrap_or(0);

    let mut input_ids_flat: Vec<i64> = Vec::with_capacity(batch_size * max_len);
    let mut attention_mask_flat: Vec<i64> = Vec::with_capacity(batch_size * max_len);

    for enc in &encodings {
        let ids = enc.get_ids();
        let pad_len = max_len - ids.len();

        input_ids_flat.extend(ids.iter().map(|&id| id as i64));
        attention_mask_flat.extend(enc.get_attention_mask().iter().map(|&m| m as i64));

        input_ids_flat.extend(std::iter::repeat_n(PAD_TOKEN_ID, pad_len));
        attention_mask_flat.extend(std::iter::repeat_n(0i64, pad_len));
    }

    let shape = [batch_size as i64, max_len as i64];

    let input_ids_tensor =
        Tensor::from_array((shape, input_ids_flat)).context("Failed to create input_ids tensor")?;
    let attention_mask_tensor = Tensor::from_array((shape, attention_mask_flat))
        .context("Failed to create attention_mask tensor")?;

    // logits: [batch, 3]
    let logits = {
        let mut session = session
            .lock()
            .map_err(|e| anyhow::anyhow!("Session lock poisoned: {}", e))?;

        let outputs = session
            .run(ort::inputs! {
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor
            })
            .context("NLI ONNX inference failed")?;

        let (_shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .context("Failed to extract NLI output tensor")?;

        data.to_vec()
    };

    if logits.len() != batch_size * NLI_CLASSES {
        anyhow::bail!(
            "Unexpected NLI output size {} for {} pairs",
            logits.len(),
            batch_size
        );
    }

    let entailment: Vec<f64> = logits
        .chunks_exact(NLI_CLASSES)
        .map(|row| row[ENTAILMENT_INDEX] as f64)
        .collect();

    debug!(pairs = batch_size, "Computed NLI entailment logits");

    Ok(entailment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[1.0, 2.0, 3.0]);
        let sum: f64 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
    }

    #[test]
    fn test_softmax_is_stable_for_large_logits() {
        let probs = softmax(&[1000.0, 1000.0]);
        assert!((probs[0] - 0.5).abs() < 1e-12);
        assert!(probs.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn test_rank_labels_orders_by_score() {
        let labels = vec!["yes".to_string(), "no".to_string()];
        let ranked = rank_labels(&labels, &[-1.0, 2.5]);
        assert_eq!(ranked[0].label, "no");
        assert_eq!(ranked[1].label, "yes");
        assert!(ranked[0].score > 0.9);
    }

    #[test]
    fn test_rank_labels_ties_keep_label_order() {
        let labels = vec!["yes".to_string(), "no".to_string()];
        let ranked = rank_labels(&labels, &[0.0, 0.0]);
        assert_eq!(ranked[0].label, "yes");
        assert!((ranked[0].score - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_hypothesis_template() {
        assert_eq!(hypothesis_for("politics"), "This example is politics.");
    }

    #[test]
    fn test_load_missing_model_errors() {
        let dir = std::env::temp_dir().join("quill-test-no-nli");
        assert!(OnnxNliClassifier::load(&dir).is_err());
    }
}
