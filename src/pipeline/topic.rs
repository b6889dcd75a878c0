// Topic labelling for the query text.
//
// The topic decides which slice of an author's corpus is compared, and is
// echoed back with the verdict. It is produced by the same zero-shot NLI
// classifier the closed-set judge uses, scored against the configured topic
// labels.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AttributionError, Result};
use crate::judge::ZeroShotClassifier;

/// A topic label and the classifier's probability for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicLabel {
    pub label: String,
    /// 0.0 to 1.0
    pub confidence: f64,
}

impl TopicLabel {
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Confidence as a percentage, rounded to two decimals.
    pub fn percent(&self) -> f64 {
        (self.confidence * 100.0 * 100.0).round() / 100.0
    }
}

/// Pick the most likely of `topics` for `text`. Returns None when no topics
/// are configured.
pub async fn classify_topic(
    classifier: &dyn ZeroShotClassifier,
    text: &str,
    topics: &[String],
) -> Result<Option<TopicLabel>> {
    if topics.is_empty() {
        return Ok(None);
    }

    let scores = classifier.classify(text, topics).await?;
    let top = scores.into_iter().next().ok_or_else(|| {
        AttributionError::Classification("classifier returned no topic scores".to_string())
    })?;

    debug!(topic = %top.label, score = top.score, "Classified query topic");

    Ok(Some(TopicLabel::new(top.label, top.score)))
}
