// Closed-set attribution judge backed by zero-shot NLI.
//
// The retrieved context and a claim of common authorship are folded into
// one sequence, which the classifier scores against the labels "yes" and
// "no". The winning label is the verdict and its probability, as a
// percentage, the confidence.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::classifier::ZeroShotClassifier;
use super::traits::{probability_to_percent, AttributionJudge, Verdict};
use crate::error::{AttributionError, Result};
use crate::output::truncate_chars;
use crate::retrieval::ContextHit;

/// The closed label set of this judge.
pub const ATTRIBUTION_LABELS: [&str; 2] = ["yes", "no"];

pub struct NliJudge {
    classifier: Arc<dyn ZeroShotClassifier>,
    labels: Vec<String>,
}

impl NliJudge {
    pub fn new(classifier: Arc<dyn ZeroShotClassifier>) -> Self {
        Self {
            classifier,
            labels: ATTRIBUTION_LABELS.iter().map(|l| l.to_string()).collect(),
        }
    }
}

/// The statement the classifier is asked about.
pub fn authorship_hypothesis(query_text: &str) -> String {
    format!("The following tweet was likely written by the same person:\n\"{query_text}\"")
}

/// Context tweets, nearest first, followed by the authorship claim.
pub fn build_sequence(query_text: &str, context: &[ContextHit]) -> String {
    let hypothesis = authorship_hypothesis(query_text);
    if context.is_empty() {
        return hypothesis;
    }

    let tweets: Vec<String> = context
        .iter()
        .map(|hit| format!("- \"{}\"", hit.record.text))
        .collect();

    format!("Author's tweets:\n{}\n\n{}", tweets.join("\n"), hypothesis)
}

#[async_trait]
impl AttributionJudge for NliJudge {
    fn name(&self) -> &'static str {
        "nli"
    }

    async fn judge(&self, query_text: &str, context: &[ContextHit]) -> Result<Verdict> {
        let sequence = build_sequence(query_text, context);
        let scores = self.classifier.classify(&sequence, &self.labels).await?;

        let top = scores.first().ok_or_else(|| {
            AttributionError::Classification("classifier returned no scores".to_string())
        })?;

        if !self.labels.contains(&top.label) {
            return Err(AttributionError::Classification(format!(
                "classifier returned unknown label '{}'",
                top.label
            )));
        }

        debug!(
            label = %top.label,
            score = top.score,
            context = context.len(),
            query_preview = %truncate_chars(query_text, 50),
            "NLI judge verdict"
        );

        Ok(Verdict::new(top.label.clone(), probability_to_percent(top.score)))
    }
}
