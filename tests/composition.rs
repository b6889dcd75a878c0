// Composition tests: the full pipeline (encoder -> index -> judge) with
// lightweight collaborators. No model files, no database.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use quill::corpus::CorpusRecord;
use quill::encoder::HashingEncoder;
use quill::judge::{
    AttributionJudge, LabelScore, LlmJudge, LlmSettings, NliJudge, OpenAiChatClient, Verdict,
    ZeroShotClassifier,
};
use quill::pipeline::{AnalysisResponse, Analyzer, Outcome, TopicLabel, NO_DATA_MESSAGE};
use quill::retrieval::ContextHit;

/// Entails "yes" when the tweet under test is word-for-word one of the
/// context tweets, "no" otherwise.
struct VerbatimClassifier;

#[async_trait]
impl ZeroShotClassifier for VerbatimClassifier {
    async fn classify(&self, sequence: &str, labels: &[String]) -> quill::Result<Vec<LabelScore>> {
        let lines: Vec<&str> = sequence.lines().collect();
        let query = lines.last().copied().unwrap_or_default();
        let seen = lines.iter().any(|l| l.strip_prefix("- ") == Some(query));

        let yes = if seen { 0.96 } else { 0.2 };
        let mut scores: Vec<LabelScore> = labels
            .iter()
            .map(|l| LabelScore {
                label: l.clone(),
                score: if l == "yes" { yes } else { 1.0 - yes },
            })
            .collect();
        scores.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(scores)
    }
}

/// Counts invocations and always answers "yes".
#[derive(Default)]
struct CountingJudge {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl AttributionJudge for CountingJudge {
    fn name(&self) -> &'static str {
        "counting"
    }

    async fn judge(&self, _query_text: &str, _context: &[ContextHit]) -> quill::Result<Verdict> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Verdict::new("yes", 100.0))
    }
}

fn nli_analyzer() -> Analyzer {
    Analyzer::new(
        Arc::new(HashingEncoder::default()),
        Box::new(NliJudge::new(Arc::new(VerbatimClassifier))),
    )
}

fn corpus() -> Vec<CorpusRecord> {
    vec![
        CorpusRecord::new("Healthcare reform matters", "Obama", "2012/05/01"),
        CorpusRecord::new("The economy is roaring back", "Trump", "2018/03/02"),
        CorpusRecord::new("We must act on climate change now", "Obama", "2015/12/12"),
    ]
}

// ============================================================
// End-to-end scenarios
// ============================================================

#[tokio::test]
async fn single_matching_record_is_attributed_with_high_confidence() {
    let corpus = vec![CorpusRecord::new("Healthcare reform matters", "Obama", "2012/05/01")];
    let outcome = nli_analyzer()
        .with_top_k(5)
        .run("Healthcare reform matters", &corpus)
        .await
        .unwrap();

    let Outcome::Judged { verdict, context } = outcome else {
        panic!("expected a judged outcome");
    };
    assert_eq!(context.len(), 1);
    assert_eq!(context[0].distance, 0.0);
    assert_eq!(context[0].record, corpus[0]);
    assert_eq!(verdict.result, "yes");
    assert!(verdict.confidence >= 90.0, "confidence {}", verdict.confidence);
}

#[tokio::test]
async fn empty_corpus_returns_no_data_without_judging() {
    let calls = Arc::new(AtomicUsize::new(0));
    let analyzer = Analyzer::new(
        Arc::new(HashingEncoder::default()),
        Box::new(CountingJudge {
            calls: calls.clone(),
        }),
    );

    let response = analyzer
        .analyze("Healthcare reform matters", &[], None)
        .await
        .unwrap();

    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        serde_json::json!({"result": NO_DATA_MESSAGE})
    );
    assert_eq!(
        NO_DATA_MESSAGE,
        "ERROR: No tweets found for this author and topic."
    );
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unreachable_llm_service_yields_recovered_error_verdict() {
    let client =
        OpenAiChatClient::new("http://127.0.0.1:1/v1", None, Duration::from_secs(2)).unwrap();
    let analyzer = Analyzer::new(
        Arc::new(HashingEncoder::default()),
        Box::new(LlmJudge::new(
            Arc::new(client),
            LlmSettings::default(),
            vec!["Obama".to_string(), "Trump".to_string()],
        )),
    );

    let response = analyzer
        .analyze("The economy is strong", &corpus(), None)
        .await
        .unwrap();

    assert_eq!(response.result, "ERROR: LLM API connection failed.");
    assert_eq!(response.confidence, Some(0.0));
    assert!(!response.explanation.unwrap_or_default().is_empty());
}

// ============================================================
// Pipeline properties
// ============================================================

#[tokio::test]
async fn repeated_analysis_is_identical() {
    let analyzer = nli_analyzer().with_top_k(2);
    let corpus = corpus();

    let first = analyzer.run("climate change is real", &corpus).await.unwrap();
    let second = analyzer.run("climate change is real", &corpus).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn context_is_bounded_by_top_k() {
    let outcome = nli_analyzer()
        .with_top_k(2)
        .run("reform the economy", &corpus())
        .await
        .unwrap();

    match outcome {
        Outcome::Judged { context, .. } => assert_eq!(context.len(), 2),
        Outcome::NoData => panic!("corpus was not empty"),
    }
}

#[test]
fn analyzer_reports_the_configured_judge() {
    assert_eq!(nli_analyzer().judge_name(), "nli");

    let counting = Analyzer::new(
        Arc::new(HashingEncoder::default()),
        Box::new(CountingJudge::default()),
    );
    assert_eq!(counting.judge_name(), "counting");
}

#[tokio::test]
async fn zero_top_k_is_rejected() {
    let err = nli_analyzer()
        .with_top_k(0)
        .run("anything", &corpus())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "invalid_query");
}

#[tokio::test]
async fn topic_is_merged_without_touching_the_verdict() {
    let analyzer = nli_analyzer();
    let corpus = corpus();
    let topic = TopicLabel::new("healthcare", 0.91234);

    let plain = analyzer
        .analyze("Healthcare reform matters", &corpus, None)
        .await
        .unwrap();
    let tagged = analyzer
        .analyze("Healthcare reform matters", &corpus, Some(&topic))
        .await
        .unwrap();

    assert_eq!(tagged.result, plain.result);
    assert_eq!(tagged.confidence, plain.confidence);
    assert_eq!(tagged.topic.as_deref(), Some("healthcare"));
    assert_eq!(tagged.topic_confidence, Some(91.23));
    assert_eq!(
        AnalysisResponse {
            topic: None,
            topic_confidence: None,
            ..tagged
        },
        plain
    );
}
