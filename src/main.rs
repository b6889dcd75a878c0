use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use quill::config::{Config, EncoderBackend, JudgeBackend};
use quill::encoder::{HashingEncoder, SentenceEncoder, TextEncoder};
use quill::judge::{
    AttributionJudge, LlmJudge, NliJudge, OnnxNliClassifier, OpenAiChatClient, ZeroShotClassifier,
};
use quill::models::{self, ENCODER_MODEL, NLI_MODEL};
use quill::output::terminal;
use quill::pipeline::{classify_topic, AnalysisResponse, Analyzer, TopicLabel};

/// Quill: semantic authorship attribution for short texts.
///
/// Compares a text against an author's previous posts and judges whether
/// that author, another, or nobody in the corpus plausibly wrote it.
#[derive(Parser)]
#[command(name = "quill", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the corpus database
    Init,

    /// Import tweets from a JSON array of records
    Import {
        /// Path to the JSON file
        file: PathBuf,
    },

    /// Download the ONNX encoder and NLI models (~490 MB)
    DownloadModel,

    /// Judge who most plausibly wrote a text
    Analyze {
        /// The text to attribute
        text: String,

        /// Only compare against this author's tweets
        #[arg(long)]
        author: Option<String>,

        /// Only compare against tweets on this topic
        #[arg(long)]
        topic: Option<String>,

        /// Number of closest tweets handed to the judge (default: QUILL_TOP_K)
        #[arg(long)]
        k: Option<usize>,

        /// Print the response map as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show corpus size, model availability and configured backends
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("quill=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            info!("Initializing Quill database...");
            let config = Config::load()?;
            let store = quill::corpus::initialize_sqlite(&config.db_path)?;
            let table_count = store.table_count().await?;
            println!("Database initialized at: {}", config.db_path);
            println!("Tables created: {table_count}");
            println!("\nNext steps:");
            println!("  quill download-model");
            println!("  quill import tweets.json");
        }

        Commands::Import { file } => {
            let config = Config::load()?;
            let records = quill::corpus::load_json_file(&file)?;
            let store = quill::corpus::initialize_sqlite(&config.db_path)?;
            let stored = store.insert_records(&records).await?;
            info!(stored, file = %file.display(), "Imported corpus records");
            println!(
                "Imported {} tweets from {} ({} total)",
                stored,
                file.display(),
                store.record_count().await?
            );
        }

        Commands::DownloadModel => {
            let config = Config::load()?;
            println!("Downloading models to {}", config.model_dir.display());
            models::download_all(&config.model_dir).await?;
            println!("\n{}", "Models ready.".green());
        }

        Commands::Analyze {
            text,
            author,
            topic,
            k,
            json,
        } => {
            let config = Config::load()?;
            let store = quill::corpus::open_sqlite(&config.db_path)?;

            // The NLI model serves both the closed-set judge and topic
            // labelling, so it is loaded at most once.
            let wants_topic = topic.is_none() && !config.topics.is_empty();
            let classifier = if config.judge_backend == JudgeBackend::Nli || wants_topic {
                config.require_classifier()?;
                Some(load_classifier(&config)?)
            } else {
                None
            };

            let topic_label = match (topic, &classifier) {
                (Some(t), _) => Some(TopicLabel::new(t, 1.0)),
                (None, Some(c)) if wants_topic => {
                    classify_topic(c.as_ref(), &text, &config.topics).await?
                }
                _ => None,
            };

            let corpus = store
                .fetch_corpus(
                    author.as_deref(),
                    topic_label.as_ref().map(|t| t.label.as_str()),
                )
                .await?;
            info!(records = corpus.len(), "Loaded comparison corpus");

            let encoder = create_encoder(&config)?;
            let judge = create_judge(&config, classifier)?;
            let analyzer =
                Analyzer::new(encoder, judge).with_top_k(k.unwrap_or(config.top_k));

            let outcome = analyzer.run(&text, &corpus).await?;

            if json {
                let response = AnalysisResponse::from_outcome(&outcome, topic_label.as_ref());
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                terminal::display_outcome(&outcome, topic_label.as_ref(), analyzer.judge_name());
            }
        }

        Commands::Status => {
            let config = Config::load()?;
            let store = quill::corpus::open_sqlite(&config.db_path).ok();
            quill::status::show(store.as_ref(), &config).await?;
        }
    }

    Ok(())
}

/// Create the text encoder for the configured backend.
/// Falls back to the hashing encoder when the ONNX model isn't downloaded.
fn create_encoder(config: &Config) -> Result<Arc<dyn TextEncoder>> {
    match config.encoder_backend {
        EncoderBackend::Onnx => {
            if config.require_encoder().is_err() {
                warn!(
                    "Encoder model not found, falling back to the hashing encoder. \
                     Run `quill download-model` for better neighbours."
                );
                return Ok(Arc::new(HashingEncoder::default()));
            }
            info!("Using local ONNX sentence encoder");
            let dir = models::model_dir(&config.model_dir, &ENCODER_MODEL);
            Ok(Arc::new(SentenceEncoder::load(&dir)?))
        }
        EncoderBackend::Hashing => {
            info!("Using hashing encoder");
            Ok(Arc::new(HashingEncoder::default()))
        }
    }
}

fn load_classifier(config: &Config) -> Result<Arc<dyn ZeroShotClassifier>> {
    let dir = models::model_dir(&config.model_dir, &NLI_MODEL);
    let classifier = OnnxNliClassifier::load(&dir)?;
    info!("Loaded zero-shot NLI classifier");
    Ok(Arc::new(classifier))
}

/// Create an attribution judge based on the configured backend.
fn create_judge(
    config: &Config,
    classifier: Option<Arc<dyn ZeroShotClassifier>>,
) -> Result<Box<dyn AttributionJudge>> {
    config.require_judge()?;
    match config.judge_backend {
        JudgeBackend::Nli => {
            info!("Using closed-set NLI judge");
            let classifier = match classifier {
                Some(c) => c,
                None => load_classifier(config)?,
            };
            Ok(Box::new(NliJudge::new(classifier)))
        }
        JudgeBackend::Llm => {
            info!(url = %config.llm_url, model = %config.llm_model, "Using delegated LLM judge");
            let client = OpenAiChatClient::new(
                &config.llm_url,
                config.llm_api_key.clone(),
                config.llm_timeout,
            )?;
            Ok(Box::new(LlmJudge::new(
                Arc::new(client),
                config.llm_settings(),
                config.known_authors.clone(),
            )))
        }
    }
}
