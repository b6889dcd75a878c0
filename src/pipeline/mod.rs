// Attribution pipeline: corpus + query text -> verdict.
//
// Stages per call: Idle -> Retrieving -> Judging -> Done. An empty corpus
// ends the call straight from Idle with the "no data" response, before the
// encoder or judge is touched. The delegated judge may end in a recovered
// error verdict; that still counts as Done from the pipeline's view.
//
// The encoder and judge are built once by the caller and injected; the
// similarity index is rebuilt inside every call.

pub mod topic;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::corpus::CorpusRecord;
use crate::encoder::TextEncoder;
use crate::error::Result;
use crate::judge::{AttributionJudge, Verdict};
use crate::retrieval::{ContextRetriever, RetrievalResult, DEFAULT_TOP_K};

pub use topic::{classify_topic, TopicLabel};

/// Result string when no records matched the author/topic filter.
pub const NO_DATA_MESSAGE: &str = "ERROR: No tweets found for this author and topic.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Idle,
    Retrieving,
    Judging,
    Done,
    EmptyCorpus,
    ErrorTerminal,
}

fn enter(stage: Stage) {
    debug!(stage = ?stage, "Pipeline stage");
}

/// What one call produced, before it is flattened into a response.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The corpus was empty; nothing was encoded or judged.
    NoData,
    Judged {
        verdict: Verdict,
        context: RetrievalResult,
    },
}

/// The map handed back to callers (and printed by `quill analyze --json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub result: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// 0.0 to 100.0
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_confidence: Option<f64>,
}

impl AnalysisResponse {
    pub fn no_data() -> Self {
        Self {
            result: NO_DATA_MESSAGE.to_string(),
            confidence: None,
            explanation: None,
            error: None,
            topic: None,
            topic_confidence: None,
        }
    }

    pub fn from_verdict(verdict: &Verdict) -> Self {
        Self {
            result: verdict.result.clone(),
            confidence: Some(verdict.confidence),
            explanation: verdict.explanation.clone(),
            error: verdict.error.clone(),
            topic: None,
            topic_confidence: None,
        }
    }

    /// Flatten an outcome and attach topic metadata. The no-data response
    /// stays bare.
    pub fn from_outcome(outcome: &Outcome, topic: Option<&TopicLabel>) -> Self {
        match outcome {
            Outcome::NoData => Self::no_data(),
            Outcome::Judged { verdict, .. } => Self::from_verdict(verdict).with_topic(topic),
        }
    }

    /// Add topic fields. Only the topic fields change.
    pub fn with_topic(mut self, topic: Option<&TopicLabel>) -> Self {
        if let Some(topic) = topic {
            self.topic = Some(topic.label.clone());
            self.topic_confidence = Some(topic.percent());
        }
        self
    }
}

pub struct Analyzer {
    retriever: ContextRetriever,
    judge: Box<dyn AttributionJudge>,
    top_k: usize,
}

impl Analyzer {
    pub fn new(encoder: Arc<dyn TextEncoder>, judge: Box<dyn AttributionJudge>) -> Self {
        Self {
            retriever: ContextRetriever::new(encoder),
            judge,
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Number of context records handed to the judge. Validated per call.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn judge_name(&self) -> &'static str {
        self.judge.name()
    }

    /// Retrieve context for `query_text` and judge it.
    pub async fn run(&self, query_text: &str, corpus: &[CorpusRecord]) -> Result<Outcome> {
        enter(Stage::Idle);
        if corpus.is_empty() {
            enter(Stage::EmptyCorpus);
            info!("No records to compare against, skipping analysis");
            return Ok(Outcome::NoData);
        }

        enter(Stage::Retrieving);
        let context = self
            .retriever
            .retrieve(corpus, query_text, self.top_k)
            .await?;

        enter(Stage::Judging);
        let verdict = self.judge.judge(query_text, &context).await?;

        enter(if verdict.is_error() {
            Stage::ErrorTerminal
        } else {
            Stage::Done
        });

        info!(
            judge = self.judge.name(),
            result = %verdict.result,
            confidence = verdict.confidence,
            context = context.len(),
            "Analysis complete"
        );

        Ok(Outcome::Judged { verdict, context })
    }

    /// Run the pipeline and flatten the outcome into a response, merging
    /// the caller's topic label.
    pub async fn analyze(
        &self,
        query_text: &str,
        corpus: &[CorpusRecord],
        topic: Option<&TopicLabel>,
    ) -> Result<AnalysisResponse> {
        let outcome = self.run(query_text, corpus).await?;
        Ok(AnalysisResponse::from_outcome(&outcome, topic))
    }
}
