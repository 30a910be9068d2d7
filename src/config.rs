//! Runtime configuration.
//!
//! A single JSON document; every section is `#[serde(default)]` so a file only
//! needs the keys it changes.  Lookup order for [`EchoConfig::load`]:
//!
//! 1. the explicit path, if given
//! 2. `$ECHOVERSE_CONFIG`
//! 3. `./echoverse.json`
//!
//! No file found means defaults.  A file that exists but does not parse is an
//! error rather than a silent fallback.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "ECHOVERSE_CONFIG";

/// Config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "echoverse.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteConfig {
    /// Seed for the rule-based rewriter's random source.  `None` seeds from
    /// OS entropy.
    pub seed: Option<u64>,
}

/// Generative-model backend used for long inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Base URL of the inference API; the model id is appended.
    pub endpoint: String,
    pub model_id: String,
    /// Name of the environment variable holding the access token.
    pub token_env: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_new_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api-inference.huggingface.co/models".into(),
            model_id: "mistralai/Mistral-7B-Instruct-v0.2".into(),
            token_env: "HUGGING_FACE_TOKEN".into(),
            temperature: 0.7,
            top_p: 0.9,
            max_new_tokens: 512,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Canonical artifact path, overwritten by every call.
    pub output_path: PathBuf,
    /// Input is cut to this many characters before synthesis.
    pub max_chars: usize,
    pub sample_rate: u32,
    /// Length of the silent placeholder.
    pub silence_ms: u32,
    pub bitrate_kbps: u32,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("outputs/echoverse_tts.mp3"),
            max_chars: 6000,
            sample_rate: 16_000,
            silence_ms: 1500,
            bitrate_kbps: 64,
        }
    }
}

/// Primary neural tier.  Only consulted when built with the `neural` feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NeuralConfig {
    pub enabled: bool,
    /// HuggingFace repository holding `config.json`, the ONNX model and voices.
    pub repo_id: String,
    /// Voice names in ordinal order: `VoiceA` → first, `VoiceB` → second.
    /// The first entry is also the default voice.
    pub voices: Vec<String>,
}

impl Default for NeuralConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            repo_id: "KittenML/kitten-tts-nano-0.8-int8".into(),
            voices: vec!["Jasper".into(), "Bella".into()],
        }
    }
}

/// Offline fallback tier (espeak-ng subprocess).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OfflineConfig {
    pub program: String,
    /// Speaking rate in words per minute before the caller's rate factor.
    pub base_rate: u32,
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            program: "espeak-ng".into(),
            base_rate: 175,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EchoConfig {
    pub rewrite: RewriteConfig,
    pub model: ModelConfig,
    pub synthesis: SynthesisConfig,
    pub neural: NeuralConfig,
    pub offline: OfflineConfig,
}

impl EchoConfig {
    /// Load configuration, searching the standard locations when `path` is
    /// `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = path.map(PathBuf::from).or_else(|| {
            let candidates = [
                std::env::var_os(CONFIG_ENV).map(PathBuf::from),
                std::env::current_dir().ok().map(|d| d.join(DEFAULT_CONFIG_FILE)),
            ];
            candidates.into_iter().flatten().find(|p| p.exists())
        });

        let Some(config_path) = resolved else {
            info!("No config file found, using defaults");
            return Ok(Self::default());
        };

        let contents = std::fs::read_to_string(&config_path).map_err(|source| ConfigError::Io {
            path: config_path.clone(),
            source,
        })?;
        let config = Self::from_json(&contents).map_err(|source| ConfigError::Parse {
            path: config_path.clone(),
            source,
        })?;
        info!("Loaded config from {}", config_path.display());
        Ok(config)
    }

    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = EchoConfig::default();
        assert_eq!(cfg.synthesis.output_path, PathBuf::from("outputs/echoverse_tts.mp3"));
        assert_eq!(cfg.synthesis.max_chars, 6000);
        assert_eq!(cfg.synthesis.sample_rate, 16_000);
        assert_eq!(cfg.model.max_new_tokens, 512);
        assert_eq!(cfg.model.token_env, "HUGGING_FACE_TOKEN");
        assert!(cfg.rewrite.seed.is_none());
    }

    #[test]
    fn test_partial_json_keeps_other_defaults() {
        let cfg = EchoConfig::from_json(r#"{ "rewrite": { "seed": 7 }, "offline": { "base_rate": 200 } }"#)
            .unwrap();
        assert_eq!(cfg.rewrite.seed, Some(7));
        assert_eq!(cfg.offline.base_rate, 200);
        assert_eq!(cfg.offline.program, "espeak-ng");
        assert_eq!(cfg.synthesis.silence_ms, 1500);
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("echo.json");
        std::fs::write(&path, r#"{ "synthesis": { "max_chars": 100 } }"#).unwrap();
        let cfg = EchoConfig::load(Some(&path)).unwrap();
        assert_eq!(cfg.synthesis.max_chars, 100);
    }

    #[test]
    fn test_load_broken_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("echo.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = EchoConfig::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    }

    #[test]
    fn test_load_missing_explicit_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = EchoConfig::load(Some(&dir.path().join("absent.json"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }), "got: {err}");
    }
}
