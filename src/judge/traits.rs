// Attribution judge trait: one capability, several interchangeable backends.
//
// The closed-set NLI judge runs locally and propagates its failures. The
// delegated LLM judge is best-effort: it turns its own failures into a
// zero-confidence verdict so the pipeline never crashes on a flaky remote.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AttributionError, Result};
use crate::retrieval::ContextHit;

/// The judge's answer for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// A label from the judge's closed set, an author name, "neither", or an
    /// "ERROR: ..." sentinel for recovered failures.
    pub result: String,
    /// 0.0 to 100.0
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    /// Machine-readable error kind, set only on recovered failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Verdict {
    /// A successful verdict. Confidence is clamped to 0-100.
    pub fn new(result: impl Into<String>, confidence: f64) -> Self {
        Self {
            result: result.into(),
            confidence: clamp_confidence(confidence),
            explanation: None,
            error: None,
        }
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        let explanation = explanation.into();
        self.explanation = (!explanation.is_empty()).then_some(explanation);
        self
    }

    /// A zero-confidence verdict standing in for a failure that was handled
    /// locally. The explanation is always non-empty.
    pub fn recovered(result: impl Into<String>, cause: &AttributionError) -> Self {
        Self {
            result: result.into(),
            confidence: 0.0,
            explanation: Some(cause.to_string()),
            error: Some(cause.kind().to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Convert a probability (0-1) to a percentage rounded to two decimals.
pub fn probability_to_percent(probability: f64) -> f64 {
    clamp_confidence((probability * 100.0 * 100.0).round() / 100.0)
}

fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 100.0)
    }
}

#[async_trait]
pub trait AttributionJudge: Send + Sync {
    /// Short backend name for logs and terminal output.
    fn name(&self) -> &'static str;

    /// Decide whether `query_text` fits the authorship of the retrieved
    /// context. `context` is ordered nearest first.
    async fn judge(&self, query_text: &str, context: &[ContextHit]) -> Result<Verdict>;
}
