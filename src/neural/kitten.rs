//! KittenTTS ONNX model run through ONNX Runtime.
//!
//! | Input       | Shape          | dtype   |
//! |-------------|----------------|---------|
//! | `input_ids` | `[1, seq_len]` | int64   |
//! | `style`     | `[1, style_d]` | float32 |
//! | `speed`     | `[1]`          | float32 |

use std::{collections::HashMap, sync::Mutex};

use anyhow::{anyhow, Context, Result};
use ort::{session::Session, value::Tensor};
use tracing::debug;

use crate::{
    config::{NeuralConfig, OfflineConfig},
    neural::{
        chunk_text,
        hub::{self, ModelFiles},
        vocab::phonemes_to_ids,
        voices::{load_voices, VoiceBank},
        NeuralSynthesizer, Waveform, CHUNK_MAX_CHARS,
    },
    synth::{EspeakEngine, VoiceLabel},
};

/// Native output rate of the model.
pub const SAMPLE_RATE: u32 = 24_000;

/// Samples cut from the end of every chunk (trailing artifact).
const TAIL_TRIM: usize = 5_000;

pub struct KittenSynthesizer {
    session: Mutex<Session>,
    voices: VoiceBank,
    speed_priors: HashMap<String, f32>,
    voice_aliases: HashMap<String, String>,
    /// Ordinal voice names; the first is the default.
    voice_order: Vec<String>,
    phonemizer: EspeakEngine,
}

impl KittenSynthesizer {
    /// Fetch the configured repository and load it.
    pub fn load(cfg: &NeuralConfig, offline: &OfflineConfig) -> Result<Self> {
        let files = hub::fetch(&cfg.repo_id)?;
        Self::from_files(files, cfg.voices.clone(), EspeakEngine::from_config(offline))
    }

    pub fn from_files(files: ModelFiles, voice_order: Vec<String>, phonemizer: EspeakEngine) -> Result<Self> {
        let session = Session::builder()
            .context("Failed to create ORT session builder")?
            .commit_from_file(&files.model)
            .with_context(|| format!("Cannot load ONNX model: {}", files.model.display()))?;
        let voices = load_voices(&files.voices)?;
        debug!("Loaded {} voices", voices.len());

        Ok(Self {
            session: Mutex::new(session),
            voices,
            speed_priors: files.speed_priors,
            voice_aliases: files.voice_aliases,
            voice_order,
            phonemizer,
        })
    }

    /// Archive key for `label`: ordinal pick, else the default voice, then
    /// through the alias table.
    fn voice_key(&self, label: &VoiceLabel) -> Result<&str> {
        let name = label
            .pick(&self.voice_order)
            .or_else(|| self.voice_order.first().map(String::as_str))
            .context("no neural voices configured")?;
        let key = self.voice_aliases.get(name).map(String::as_str).unwrap_or(name);
        if !self.voices.contains_key(key) {
            let mut known: Vec<&String> = self.voices.keys().collect();
            known.sort();
            anyhow::bail!("Voice '{name}' not found. Available: {known:?}");
        }
        Ok(key)
    }

    /// One chunk: IPA → samples, tail trimmed.
    fn infer(&self, ipa: &str, style_len: usize, voice_key: &str, speed: f32) -> Result<Vec<f32>> {
        let style = self
            .voices
            .get(voice_key)
            .with_context(|| format!("Voice '{voice_key}' not loaded"))?
            .row_for(style_len);

        let ids = phonemes_to_ids(ipa);
        let seq_len = ids.len();

        let t_ids = Tensor::<i64>::from_array(([1usize, seq_len], ids)).context("Failed to build input_ids tensor")?;
        let t_style = Tensor::<f32>::from_array(([1usize, style.len()], style.to_vec()))
            .context("Failed to build style tensor")?;
        let t_speed = Tensor::<f32>::from_array(([1usize], vec![speed])).context("Failed to build speed tensor")?;

        let mut session = self.session.lock().map_err(|_| anyhow!("ORT session mutex poisoned"))?;
        let outputs = session
            .run(ort::inputs![t_ids, t_style, t_speed])
            .context("ONNX inference failed")?;
        let (_shape, audio) = outputs[0].try_extract_tensor::<f32>().context("Failed to extract audio tensor")?;

        let keep = audio.len().saturating_sub(TAIL_TRIM);
        Ok(audio[..keep].to_vec())
    }
}

impl NeuralSynthesizer for KittenSynthesizer {
    fn synthesize(&self, text: &str, voice: &VoiceLabel, speed: f32) -> Result<Waveform> {
        let key = self.voice_key(voice)?;
        let speed = speed * self.speed_priors.get(key).copied().unwrap_or(1.0);

        let mut samples = Vec::new();
        for chunk in chunk_text(text, CHUNK_MAX_CHARS) {
            let ipa = self
                .phonemizer
                .phonemize(&chunk)
                .with_context(|| format!("Phonemisation failed for {chunk:?}"))?;
            samples.extend(self.infer(&ipa, chunk.len(), key, speed)?);
        }
        debug!("Neural tier produced {} samples with voice {key}", samples.len());
        Ok(Waveform { samples, sample_rate: SAMPLE_RATE })
    }
}
