// System status display: corpus size, per-author counts, model availability.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use crate::config::{Config, EncoderBackend, JudgeBackend};
use crate::corpus::CorpusStore;
use crate::models::{self, ENCODER_MODEL, NLI_MODEL};
use crate::output::terminal;

/// Display system status to the terminal.
pub async fn show(store: Option<&Arc<dyn CorpusStore>>, config: &Config) -> Result<()> {
    match store {
        Some(store) if Path::new(&config.db_path).exists() => {
            let file_size = std::fs::metadata(&config.db_path)
                .map(|m| format_bytes(m.len()))
                .unwrap_or_else(|_| "unknown".to_string());
            println!("Database: {} ({})", config.db_path, file_size);
            println!("Tweets: {}", store.record_count().await?);
            terminal::display_author_counts(&store.author_counts().await?);
        }
        _ => {
            println!("Database: not initialized");
            println!("  Run `quill init` to set up the database.");
        }
    }

    println!();
    println!("Models: {}", config.model_dir.display());
    for spec in [ENCODER_MODEL, NLI_MODEL] {
        let state = if models::model_files_present(&config.model_dir, &spec) {
            "present"
        } else {
            "missing"
        };
        println!("  {:<20} {}", spec.subdir, state);
    }

    let encoder = match config.encoder_backend {
        EncoderBackend::Onnx => "onnx (all-MiniLM-L6-v2)",
        EncoderBackend::Hashing => "hashing",
    };
    let judge = match config.judge_backend {
        JudgeBackend::Nli => "nli (bart-large-mnli)".to_string(),
        JudgeBackend::Llm => format!("llm ({} at {})", config.llm_model, config.llm_url),
    };
    println!();
    println!("Encoder: {}", encoder);
    println!("Judge: {}", judge);
    println!("Top-k: {}", config.top_k);
    if !config.topics.is_empty() {
        println!("Topics: {}", config.topics.join(", "));
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
