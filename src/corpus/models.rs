// Corpus data model: the records the attribution pipeline compares against.
//
// Records arrive from the corpus store (or a JSON import) and are read-only
// from then on. Only `text` and `author` are required; the analytics fields
// are optional because different upstream queries populate different subsets.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Sentiment label attached to a record by the upstream sentiment model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }

    /// Parse a stored label. Case-insensitive; unknown labels yield None.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "positive" => Some(Sentiment::Positive),
            "neutral" => Some(Sentiment::Neutral),
            "negative" => Some(Sentiment::Negative),
            _ => None,
        }
    }
}

/// One previously authored text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusRecord {
    pub text: String,
    pub author: String,
    /// "YYYY/MM/DD" or "YYYY-MM-DD", not normalized.
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub sentiment: Option<Sentiment>,
    /// 0.0 to 1.0
    #[serde(default)]
    pub sentiment_confidence: Option<f64>,
    #[serde(default)]
    pub likes: Option<u64>,
    #[serde(default)]
    pub retweets: Option<u64>,
    #[serde(default)]
    pub topic: Option<String>,
}

impl CorpusRecord {
    /// Minimal record with only the required fields set.
    pub fn new(text: impl Into<String>, author: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            author: author.into(),
            date: date.into(),
            sentiment: None,
            sentiment_confidence: None,
            likes: None,
            retweets: None,
            topic: None,
        }
    }

    /// Parse `date` into a calendar day, accepting both separators.
    ///
    /// A trailing time component ("2012/05/01 14:03" or "2012-05-01T14:03")
    /// is ignored. Returns None for anything else; callers treat that as
    /// "unknown date", never as an error.
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        let day = self
            .date
            .trim()
            .split(|c: char| c.is_whitespace() || c == 'T')
            .next()?;

        ["%Y/%m/%d", "%Y-%m-%d"]
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(day, fmt).ok())
    }
}
