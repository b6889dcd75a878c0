// Delegated attribution judge: ask a remote language model.
//
// The prompt lists the retrieved tweets with their authors, then the tweet
// under test, then a fixed question naming the candidate authors. The reply
// is free text, parsed by looking for candidate names in priority order;
// the first one found wins and "neither" is the default. The whole reply is
// kept as the explanation.
//
// This judge is advisory. A single attempt is made, and any failure becomes
// a zero-confidence verdict instead of an error.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex_lite::Regex;
use tracing::{debug, warn};

use super::chat::{ChatClient, ChatMessage, ChatRequest};
use super::traits::{AttributionJudge, Verdict};
use crate::error::{AttributionError, Result};
use crate::retrieval::ContextHit;

/// Result when no candidate name appears in the reply.
pub const NEITHER: &str = "neither";

pub const CONNECTION_FAILED: &str = "ERROR: LLM API connection failed.";
pub const CALL_FAILED: &str = "ERROR: LLM API call failed.";

/// Confidence reported when the reply names no percentage.
pub const DEFAULT_CONFIDENCE: f64 = 50.0;

const SYSTEM_PROMPT: &str = "You are an authorship attribution assistant. \
You compare the vocabulary, tone and themes of short social media posts \
to decide who most plausibly wrote them. Answer briefly.";

/// Sampling parameters sent with every request.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: "phi-2".to_string(),
            max_tokens: 100,
            temperature: 0.1,
        }
    }
}

pub struct LlmJudge {
    client: Arc<dyn ChatClient>,
    settings: LlmSettings,
    known_authors: Vec<String>,
}

impl LlmJudge {
    /// `known_authors` is the ordered candidate list; earlier names win when
    /// a reply mentions several. Leave it empty to use the authors found in
    /// the retrieved context instead.
    pub fn new(client: Arc<dyn ChatClient>, settings: LlmSettings, known_authors: Vec<String>) -> Self {
        Self {
            client,
            settings,
            known_authors: known_authors
                .into_iter()
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty())
                .collect(),
        }
    }

    /// The names the question offers, in priority order.
    pub fn candidates(&self, context: &[ContextHit]) -> Vec<String> {
        if !self.known_authors.is_empty() {
            return self.known_authors.clone();
        }
        context_authors(context)
    }

    fn build_request(&self, query_text: &str, context: &[ContextHit], candidates: &[String]) -> ChatRequest {
        ChatRequest {
            model: self.settings.model.clone(),
            messages: vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(build_prompt(query_text, context, candidates)),
            ],
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        }
    }
}

/// Distinct context authors, first-seen order, compared case-insensitively.
pub fn context_authors(context: &[ContextHit]) -> Vec<String> {
    let mut authors: Vec<String> = Vec::new();
    for hit in context {
        let author = hit.record.author.trim();
        if author.is_empty() {
            continue;
        }
        if !authors.iter().any(|a| a.eq_ignore_ascii_case(author)) {
            authors.push(author.to_string());
        }
    }
    authors
}

/// "Could this tweet have been written by A, B, or neither?"
pub fn candidate_question(candidates: &[String]) -> String {
    if candidates.is_empty() {
        return "Could this tweet have been written by any of these authors, or neither?".to_string();
    }
    format!(
        "Could this tweet have been written by {}, or {NEITHER}?",
        candidates.join(", ")
    )
}

pub fn build_prompt(query_text: &str, context: &[ContextHit], candidates: &[String]) -> String {
    let tweets: Vec<String> = context
        .iter()
        .map(|hit| format!("- {}: \"{}\"", hit.record.author, hit.record.text))
        .collect();

    format!(
        "I will provide you with a list of tweets, each labelled with its author.\n\n\
         Known tweets:\n{}\n\n\
         Now, consider this new tweet:\n\n\"{}\"\n\n\
         Question: {}\n\
         Answer with the author's name or \"{NEITHER}\", then a confidence percentage, \
         then one sentence of explanation.",
        tweets.join("\n"),
        query_text,
        candidate_question(candidates),
    )
}

/// First candidate whose name occurs in the reply (case-insensitive), else
/// "neither". Candidates are tried in order, not by position in the reply.
pub fn match_author(reply: &str, candidates: &[String]) -> String {
    let haystack = reply.to_lowercase();
    candidates
        .iter()
        .find(|name| !name.is_empty() && haystack.contains(&name.to_lowercase()))
        .cloned()
        .unwrap_or_else(|| NEITHER.to_string())
}

/// First whole "NN%" figure in the reply, clamped to 0-100. A leading minus
/// sign counts; a hyphen after a digit ("10-20%") is a range, not a sign.
pub fn extract_confidence(reply: &str) -> Option<f64> {
    static PERCENT: OnceLock<Regex> = OnceLock::new();
    let re = PERCENT.get_or_init(|| {
        Regex::new(r"(?:^|[^\d.])(-?\d+(?:\.\d+)?)\s*%").expect("valid confidence pattern")
    });

    re.captures(reply)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .map(|v| v.clamp(0.0, 100.0))
}

#[async_trait]
impl AttributionJudge for LlmJudge {
    fn name(&self) -> &'static str {
        "llm"
    }

    async fn judge(&self, query_text: &str, context: &[ContextHit]) -> Result<Verdict> {
        let candidates = self.candidates(context);
        let request = self.build_request(query_text, context, &candidates);

        let verdict = match self.client.complete(&request).await {
            Ok(reply) => {
                let reply = reply.trim();
                let author = match_author(reply, &candidates);
                let confidence = extract_confidence(reply).unwrap_or(DEFAULT_CONFIDENCE);
                debug!(author = %author, confidence = confidence, "LLM judge verdict");
                Verdict::new(author, confidence).with_explanation(reply)
            }
            Err(err @ AttributionError::JudgeConnection(_)) => {
                warn!("LLM judge could not reach the service: {err}");
                Verdict::recovered(CONNECTION_FAILED, &err)
            }
            Err(err) => {
                warn!("LLM judge call failed: {err}");
                Verdict::recovered(CALL_FAILED, &err)
            }
        };

        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::CorpusRecord;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn hit(text: &str, author: &str) -> ContextHit {
        ContextHit {
            record: CorpusRecord::new(text, author, "2016/01/01"),
            distance: 0.0,
        }
    }

    #[test]
    fn test_match_author_priority_order_wins() {
        // Trump appears first in the reply, but Obama is first in priority.
        let reply = "Trump? No. This reads like Obama.";
        assert_eq!(match_author(reply, &names(&["Obama", "Trump"])), "Obama");
    }

    #[test]
    fn test_match_author_is_case_insensitive() {
        assert_eq!(match_author("probably OBAMA", &names(&["Obama"])), "Obama");
    }

    #[test]
    fn test_match_author_defaults_to_neither() {
        assert_eq!(match_author("Hard to say.", &names(&["Obama", "Trump"])), NEITHER);
        assert_eq!(match_author("Obama", &[]), NEITHER);
    }

    #[test]
    fn test_extract_confidence() {
        assert_eq!(extract_confidence("Obama, 85% sure"), Some(85.0));
        assert_eq!(extract_confidence("Confidence: 72.5 %"), Some(72.5));
        assert_eq!(extract_confidence("999% certain"), Some(100.0));
        assert_eq!(extract_confidence("no figure here"), None);
    }

    #[test]
    fn test_extract_confidence_reads_whole_numbers() {
        assert_eq!(extract_confidence("1000% sure"), Some(100.0));
        assert_eq!(extract_confidence("-20% likely"), Some(0.0));
        assert_eq!(extract_confidence("somewhere in 10-20%"), Some(20.0));
        assert_eq!(extract_confidence("Obama (v2.5% drift)"), Some(2.5));
    }

    #[test]
    fn test_candidate_question_formats() {
        assert_eq!(
            candidate_question(&names(&["Obama", "Trump"])),
            "Could this tweet have been written by Obama, Trump, or neither?"
        );
        assert_eq!(
            candidate_question(&names(&["Obama"])),
            "Could this tweet have been written by Obama, or neither?"
        );
    }

    #[test]
    fn test_context_authors_dedup_first_seen() {
        let context = vec![hit("a", "Trump"), hit("b", "obama"), hit("c", "TRUMP"), hit("d", "")];
        assert_eq!(context_authors(&context), names(&["Trump", "obama"]));
    }

    #[test]
    fn test_prompt_annotates_authors() {
        let context = vec![hit("Yes we can", "Obama")];
        let prompt = build_prompt("Change is coming", &context, &names(&["Obama", "Trump"]));
        assert!(prompt.contains("- Obama: \"Yes we can\""));
        assert!(prompt.contains("\"Change is coming\""));
        assert!(prompt.contains("Obama, Trump, or neither?"));
    }
}
