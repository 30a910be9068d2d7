//! Model fetch from the HuggingFace Hub.
//!
//! A KittenTTS repository carries a `config.json` naming the ONNX model and
//! the voices archive.  Files land in the Hub cache (`~/.cache/huggingface/hub`
//! by default) and are reused on later loads.

use std::{collections::HashMap, path::PathBuf};

use anyhow::{bail, Context, Result};
use hf_hub::api::sync::Api;
use serde::Deserialize;
use tracing::info;

/// `config.json` of a KittenTTS repository.
#[derive(Debug, Deserialize)]
pub struct RepoConfig {
    /// `"ONNX1"` or `"ONNX2"`.
    #[serde(rename = "type")]
    pub model_type: String,
    pub model_file: String,
    pub voices: String,
    #[serde(default)]
    pub speed_priors: HashMap<String, f32>,
    /// Friendly voice name → archive key.
    #[serde(default)]
    pub voice_aliases: HashMap<String, String>,
}

impl RepoConfig {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let config: Self = serde_json::from_slice(bytes).context("Failed to parse config.json")?;
        if !matches!(config.model_type.as_str(), "ONNX1" | "ONNX2") {
            bail!("Unsupported model type '{}', expected ONNX1 or ONNX2", config.model_type);
        }
        Ok(config)
    }
}

/// Local paths of a fetched model plus its tuning tables.
#[derive(Debug)]
pub struct ModelFiles {
    pub model: PathBuf,
    pub voices: PathBuf,
    pub speed_priors: HashMap<String, f32>,
    pub voice_aliases: HashMap<String, String>,
}

/// Expand a bare model name to the `KittenML/` organisation.
pub fn qualify_repo_id(repo_id: &str) -> String {
    if repo_id.contains('/') {
        repo_id.to_string()
    } else {
        format!("KittenML/{repo_id}")
    }
}

/// Download (or reuse from cache) everything needed to load `repo_id`.
pub fn fetch(repo_id: &str) -> Result<ModelFiles> {
    let repo_id = qualify_repo_id(repo_id);
    let api = Api::new().context("Failed to initialise HuggingFace Hub client")?;
    let repo = api.model(repo_id.clone());
    let get = |file: &str| {
        repo.get(file).with_context(|| format!("Failed to download '{file}' from '{repo_id}'"))
    };

    info!("Fetching {repo_id}…");
    let config_path = get("config.json")?;
    let bytes = std::fs::read(&config_path)
        .with_context(|| format!("Cannot read config: {}", config_path.display()))?;
    let config = RepoConfig::parse(&bytes)?;

    let model = get(&config.model_file)?;
    let voices = get(&config.voices)?;
    info!("Model files ready: {}, {}", model.display(), voices.display());

    Ok(ModelFiles {
        model,
        voices,
        speed_priors: config.speed_priors,
        voice_aliases: config.voice_aliases,
    })
}
