use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::judge::LlmSettings;
use crate::models::{self, ENCODER_MODEL, NLI_MODEL};
use crate::retrieval::DEFAULT_TOP_K;

/// Which text encoder to use.
#[derive(Debug, Clone, PartialEq)]
pub enum EncoderBackend {
    /// Local all-MiniLM-L6-v2 ONNX model (default)
    Onnx,
    /// Feature hashing, no model files needed. Coarser neighbours.
    Hashing,
}

/// Which attribution judge to use.
#[derive(Debug, Clone, PartialEq)]
pub enum JudgeBackend {
    /// Local zero-shot NLI over {"yes", "no"} (default)
    Nli,
    /// Remote OpenAI-compatible chat-completions service
    Llm,
}

/// Central configuration loaded from environment variables.
///
/// The .env file is loaded automatically at startup via dotenvy.
pub struct Config {
    pub db_path: String,
    /// Root directory holding one subdirectory per ONNX model
    pub model_dir: PathBuf,
    pub encoder_backend: EncoderBackend,
    pub judge_backend: JudgeBackend,
    /// Number of context records handed to the judge
    pub top_k: usize,
    /// Candidate authors for the LLM judge, in priority order
    pub known_authors: Vec<String>,
    /// Topic labels for query classification. Empty disables topic labelling.
    pub topics: Vec<String>,
    pub llm_url: String,
    pub llm_model: String,
    pub llm_api_key: Option<String>,
    pub llm_timeout: Duration,
    pub llm_max_tokens: u32,
    pub llm_temperature: f32,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Everything has a default. A value that is set but malformed is an
    /// error rather than silently replaced.
    pub fn load() -> Result<Self> {
        let encoder_backend = match env::var("QUILL_ENCODER").as_deref() {
            Ok("hashing") => EncoderBackend::Hashing,
            Ok("onnx") | Err(_) => EncoderBackend::Onnx,
            Ok(other) => anyhow::bail!("QUILL_ENCODER must be \"onnx\" or \"hashing\", got {other:?}"),
        };

        let judge_backend = match env::var("QUILL_JUDGE").as_deref() {
            Ok("llm") => JudgeBackend::Llm,
            Ok("nli") | Err(_) => JudgeBackend::Nli,
            Ok(other) => anyhow::bail!("QUILL_JUDGE must be \"nli\" or \"llm\", got {other:?}"),
        };

        let model_dir = env::var("QUILL_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| models::default_model_dir());

        let llm = LlmSettings::default();

        Ok(Self {
            db_path: env::var("QUILL_DB_PATH").unwrap_or_else(|_| "./quill.db".to_string()),
            model_dir,
            encoder_backend,
            judge_backend,
            top_k: parse_var("QUILL_TOP_K", DEFAULT_TOP_K)?,
            known_authors: parse_list(&env::var("QUILL_KNOWN_AUTHORS").unwrap_or_default()),
            topics: parse_list(&env::var("QUILL_TOPICS").unwrap_or_default()),
            llm_url: env::var("QUILL_LLM_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8080/v1".to_string()),
            llm_model: env::var("QUILL_LLM_MODEL").unwrap_or(llm.model),
            llm_api_key: env::var("QUILL_LLM_API_KEY").ok().filter(|k| !k.is_empty()),
            llm_timeout: Duration::from_secs(parse_var("QUILL_LLM_TIMEOUT_SECS", 30)?),
            llm_max_tokens: parse_var("QUILL_LLM_MAX_TOKENS", llm.max_tokens)?,
            llm_temperature: parse_var("QUILL_LLM_TEMPERATURE", llm.temperature)?,
        })
    }

    pub fn llm_settings(&self) -> LlmSettings {
        LlmSettings {
            model: self.llm_model.clone(),
            max_tokens: self.llm_max_tokens,
            temperature: self.llm_temperature,
        }
    }

    /// Validate that the chosen encoder has what it needs.
    /// For ONNX: model files must exist (or user should run download-model).
    pub fn require_encoder(&self) -> Result<()> {
        match self.encoder_backend {
            EncoderBackend::Onnx => {
                if !models::model_files_present(&self.model_dir, &ENCODER_MODEL) {
                    anyhow::bail!(
                        "Encoder model files not found in {}\n\
                         Run `quill download-model` to download them.\n\
                         Or set QUILL_ENCODER=hashing to use the model-free encoder.",
                        models::model_dir(&self.model_dir, &ENCODER_MODEL).display()
                    );
                }
                Ok(())
            }
            EncoderBackend::Hashing => Ok(()),
        }
    }

    /// Validate that the NLI model is present. The closed-set judge and
    /// topic labelling both need it.
    pub fn require_classifier(&self) -> Result<()> {
        if !models::model_files_present(&self.model_dir, &NLI_MODEL) {
            anyhow::bail!(
                "NLI model files not found in {}\n\
                 Run `quill download-model` to download them.\n\
                 Or set QUILL_JUDGE=llm to use a remote language model instead.",
                models::model_dir(&self.model_dir, &NLI_MODEL).display()
            );
        }
        Ok(())
    }

    /// Validate that the chosen judge has what it needs.
    pub fn require_judge(&self) -> Result<()> {
        match self.judge_backend {
            JudgeBackend::Nli => self.require_classifier(),
            JudgeBackend::Llm => {
                if self.llm_url.trim().is_empty() {
                    anyhow::bail!("QUILL_LLM_URL is empty. Point it at an OpenAI-compatible /v1 endpoint.");
                }
                Ok(())
            }
        }
    }
}

/// Comma-separated list, trimmed, blanks dropped.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => parse_value(name, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T>(name: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse::<T>()
        .with_context(|| format!("{name} has an invalid value: {raw:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_trims_and_drops_blanks() {
        assert_eq!(
            parse_list(" Barack Obama, Donald J. Trump ,,"),
            vec!["Barack Obama".to_string(), "Donald J. Trump".to_string()]
        );
        assert!(parse_list("").is_empty());
        assert!(parse_list(" , ").is_empty());
    }

    #[test]
    fn test_parse_value_accepts_padded_numbers() {
        let k: usize = parse_value("QUILL_TOP_K", " 7 ").unwrap();
        assert_eq!(k, 7);
        let t: f32 = parse_value("QUILL_LLM_TEMPERATURE", "0.25").unwrap();
        assert_eq!(t, 0.25);
    }

    #[test]
    fn test_parse_value_rejects_garbage() {
        let err = parse_value::<usize>("QUILL_TOP_K", "five").unwrap_err();
        assert!(err.to_string().contains("QUILL_TOP_K"));
        assert!(parse_value::<u64>("QUILL_LLM_TIMEOUT_SECS", "-1").is_err());
    }
}
