// Error taxonomy for the attribution pipeline.
//
// The pipeline distinguishes business outcomes (an empty corpus) from local
// precondition failures and internal computation failures. Application code
// (CLI, config, corpus store) stays on anyhow; everything that crosses the
// encoder / index / retriever / judge seams uses this enum so callers can
// match on the kind instead of parsing messages.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AttributionError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AttributionError {
    /// No records matched the requested author/topic. Upstream treats this
    /// as "zero tweets found", not as a bug.
    #[error("Corpus is empty: nothing to compare against")]
    EmptyCorpus,

    /// Malformed `k` or query text, rejected before any encoding work.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Encoding failed: {0}")]
    Encoding(String),

    #[error("Similarity index error: {0}")]
    Index(String),

    /// The closed-set zero-shot classifier failed.
    #[error("Classification failed: {0}")]
    Classification(String),

    /// The remote judgment service could not be reached (includes timeouts).
    #[error("Judge connection failed: {0}")]
    JudgeConnection(String),

    /// The remote judgment service was reached but the call did not produce
    /// a usable reply.
    #[error("Judge inference failed: {0}")]
    JudgeInference(String),
}

impl AttributionError {
    /// Stable machine-readable name for the error kind, suitable for the
    /// `error` field of a response payload.
    pub fn kind(&self) -> &'static str {
        match self {
            AttributionError::EmptyCorpus => "empty_corpus",
            AttributionError::InvalidQuery(_) => "invalid_query",
            AttributionError::Encoding(_) => "encoding",
            AttributionError::Index(_) => "index",
            AttributionError::Classification(_) => "classification",
            AttributionError::JudgeConnection(_) => "judge_connection",
            AttributionError::JudgeInference(_) => "judge_inference",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_are_distinct() {
        let errors = [
            AttributionError::EmptyCorpus,
            AttributionError::InvalidQuery(String::new()),
            AttributionError::Encoding(String::new()),
            AttributionError::Index(String::new()),
            AttributionError::Classification(String::new()),
            AttributionError::JudgeConnection(String::new()),
            AttributionError::JudgeInference(String::new()),
        ];
        let mut kinds: Vec<&str> = errors.iter().map(|e| e.kind()).collect();
        kinds.sort_unstable();
        kinds.dedup();
        assert_eq!(kinds.len(), errors.len());
    }

    #[test]
    fn test_display_includes_detail() {
        let err = AttributionError::InvalidQuery("k must be at least 1".to_string());
        assert_eq!(err.to_string(), "Invalid query: k must be at least 1");
    }
}
