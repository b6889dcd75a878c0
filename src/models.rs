// Model download and lookup for the local ONNX models.
//
// Two frozen models are used:
// 1. all-MiniLM-L6-v2: sentence embeddings for context retrieval (~90 MB)
// 2. bart-large-mnli (quantized): zero-shot NLI for the closed-set judge
//    and topic labelling (~400 MB)
//
// Each lives in its own subdirectory of the model root as `model.onnx` +
// `tokenizer.json`. The root defaults to ~/.local/share/quill/models/ on
// Linux so downloads persist across runs.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tokenizers::{Tokenizer, TruncationParams, TruncationStrategy};
use tracing::info;

/// Where a model comes from and where it goes.
#[derive(Debug, Clone, Copy)]
pub struct ModelSpec {
    /// Human-readable name for progress output.
    pub name: &'static str,
    /// Subdirectory of the model root.
    pub subdir: &'static str,
    /// HuggingFace `resolve/main` URL of the repository.
    pub base_url: &'static str,
    /// Path of the ONNX weights inside the repository.
    pub remote_model_file: &'static str,
    pub approx_size: &'static str,
}

pub const ENCODER_MODEL: ModelSpec = ModelSpec {
    name: "Sentence encoder (all-MiniLM-L6-v2)",
    subdir: "all-MiniLM-L6-v2",
    base_url: "https://huggingface.co/sentence-transformers/all-MiniLM-L6-v2/resolve/main",
    remote_model_file: "onnx/model.onnx",
    approx_size: "~90 MB",
};

pub const NLI_MODEL: ModelSpec = ModelSpec {
    name: "Zero-shot NLI classifier (bart-large-mnli)",
    subdir: "bart-large-mnli",
    base_url: "https://huggingface.co/Xenova/bart-large-mnli/resolve/main",
    remote_model_file: "onnx/model_quantized.onnx",
    approx_size: "~400 MB",
};

const MODEL_FILE: &str = "model.onnx";
const TOKENIZER_FILE: &str = "tokenizer.json";

/// Returns the default directory for storing model files.
pub fn default_model_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("quill")
        .join("models")
}

/// Directory of one model under the model root.
pub fn model_dir(base: &Path, spec: &ModelSpec) -> PathBuf {
    base.join(spec.subdir)
}

/// Check whether both files of a model exist.
pub fn model_files_present(base: &Path, spec: &ModelSpec) -> bool {
    let dir = model_dir(base, spec);
    dir.join(MODEL_FILE).exists() && dir.join(TOKENIZER_FILE).exists()
}

/// Load `tokenizer.json` and cap every encoding at `max_length` tokens.
///
/// The downloaded tokenizer files don't reliably carry a truncation setting,
/// and the ONNX graphs fail outright past their position limit.
pub fn load_tokenizer(
    path: &Path,
    max_length: usize,
    strategy: TruncationStrategy,
) -> Result<Tokenizer> {
    let mut tokenizer = Tokenizer::from_file(path)
        .map_err(|e| anyhow::anyhow!("Failed to load tokenizer {}: {}", path.display(), e))?;
    limit_tokens(&mut tokenizer, max_length, strategy)?;
    Ok(tokenizer)
}

fn limit_tokens(
    tokenizer: &mut Tokenizer,
    max_length: usize,
    strategy: TruncationStrategy,
) -> Result<()> {
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length,
            strategy,
            ..Default::default()
        }))
        .map_err(|e| anyhow::anyhow!("Invalid truncation settings: {}", e))?;
    Ok(())
}

/// Download every model the application can use.
pub async fn download_all(base: &Path) -> Result<()> {
    for spec in [ENCODER_MODEL, NLI_MODEL] {
        download_model(base, &spec).await?;
    }
    Ok(())
}

/// Download one model's tokenizer and weights, skipping files that exist.
pub async fn download_model(base: &Path, spec: &ModelSpec) -> Result<()> {
    let dir = model_dir(base, spec);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create model directory: {}", dir.display()))?;

    println!("\n{}:", spec.name);

    let tokenizer_path = dir.join(TOKENIZER_FILE);
    if tokenizer_path.exists() {
        info!("{} tokenizer already exists, skipping", spec.subdir);
        println!("  {} (already exists)", TOKENIZER_FILE);
    } else {
        println!("  Downloading {}...", TOKENIZER_FILE);
        download_file(
            &format!("{}/{}", spec.base_url, TOKENIZER_FILE),
            &tokenizer_path,
            false,
        )
        .await?;
    }

    let model_path = dir.join(MODEL_FILE);
    if model_path.exists() {
        info!("{} weights already exist, skipping", spec.subdir);
        println!("  {} (already exists)", MODEL_FILE);
    } else {
        println!("  Downloading {} ({})...", MODEL_FILE, spec.approx_size);
        download_file(
            &format!("{}/{}", spec.base_url, spec.remote_model_file),
            &model_path,
            true,
        )
        .await?;
    }

    Ok(())
}

/// Download a single file from a URL to a local path.
/// If `show_progress` is true, display a progress bar.
async fn download_file(url: &str, dest: &Path, show_progress: bool) -> Result<()> {
    let client = reqwest::Client::new();
    let mut response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to download {}", url))?;

    if !response.status().is_success() {
        anyhow::bail!("Download failed with status {}: {}", response.status(), url);
    }

    let pb = if show_progress {
        Some(progress_bar(response.content_length()))
    } else {
        None
    };

    let mut bytes: Vec<u8> = Vec::with_capacity(response.content_length().unwrap_or(0) as usize);
    while let Some(chunk) = response
        .chunk()
        .await
        .with_context(|| format!("Failed to read response body from {}", url))?
    {
        bytes.extend_from_slice(&chunk);
        if let Some(ref pb) = pb {
            pb.set_position(bytes.len() as u64);
        }
    }

    // A truncated model must never look present.
    let partial = dest.with_extension("part");
    std::fs::write(&partial, &bytes)
        .with_context(|| format!("Failed to write {}", partial.display()))?;
    std::fs::rename(&partial, dest)
        .with_context(|| format!("Failed to move download into {}", dest.display()))?;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    info!("Downloaded {} to {}", url, dest.display());
    Ok(())
}

fn progress_bar(total_size: Option<u64>) -> ProgressBar {
    match total_size {
        Some(size) => {
            let pb = ProgressBar::new(size);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("    [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                    .expect("valid template")
                    .progress_chars("=> "),
            );
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("    {spinner} {bytes}")
                    .expect("valid template"),
            );
            pb
        }
    }
}
