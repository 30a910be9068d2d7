//! Primary synthesis tier: a neural text-to-speech model.
//!
//! The tier is a [`NeuralSynthesizer`] held in a [`ResourcePool`], so the
//! model is fetched and loaded on first use.  The bundled implementation is a
//! KittenTTS ONNX model (feature `neural`):
//!
//! 1. **Chunking**: text split into sentence chunks of at most 400 characters.
//! 2. **Phonemisation**: espeak-ng renders each chunk as IPA.
//! 3. **Tokenisation**: IPA characters mapped to vocabulary ids.
//! 4. **Inference**: `(input_ids, style, speed)` → waveform at 24 kHz.
//! 5. **Concat**: chunk waveforms joined in order.
//!
//! Without the feature the pool reports itself unavailable and the pipeline
//! starts at the offline tier.

#[cfg(feature = "neural")]
pub mod hub;
#[cfg(feature = "neural")]
pub mod kitten;
#[cfg(feature = "neural")]
pub mod vocab;
#[cfg(feature = "neural")]
pub mod voices;

use anyhow::Result;

use crate::{
    config::{NeuralConfig, OfflineConfig},
    pool::ResourcePool,
    synth::VoiceLabel,
};

#[cfg(feature = "neural")]
pub use kitten::KittenSynthesizer;

/// Maximum characters per inference chunk.
pub const CHUNK_MAX_CHARS: usize = 400;

const POOL_NAME: &str = "neural speech model";

/// Mono samples at the model's native rate.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

pub trait NeuralSynthesizer: Send + Sync {
    /// `speed` is already clamped by the caller.
    fn synthesize(&self, text: &str, voice: &VoiceLabel, speed: f32) -> Result<Waveform>;
}

/// The neural tier described by `cfg`.
pub fn default_pool(cfg: &NeuralConfig, offline: &OfflineConfig) -> ResourcePool<Box<dyn NeuralSynthesizer>> {
    if !cfg.enabled {
        return ResourcePool::unavailable(POOL_NAME, "neural tier disabled in config");
    }
    model_pool(cfg, offline)
}

#[cfg(feature = "neural")]
fn model_pool(cfg: &NeuralConfig, offline: &OfflineConfig) -> ResourcePool<Box<dyn NeuralSynthesizer>> {
    let cfg = cfg.clone();
    let offline = offline.clone();
    ResourcePool::new(POOL_NAME, move || {
        Ok(Box::new(KittenSynthesizer::load(&cfg, &offline)?) as Box<dyn NeuralSynthesizer>)
    })
}

#[cfg(not(feature = "neural"))]
fn model_pool(_cfg: &NeuralConfig, _offline: &OfflineConfig) -> ResourcePool<Box<dyn NeuralSynthesizer>> {
    ResourcePool::unavailable(POOL_NAME, "built without the `neural` feature")
}

// ─────────────────────────────────────────────────────────────────────────────
// Chunking
// ─────────────────────────────────────────────────────────────────────────────

/// Terminate a chunk with punctuation so the model ends it with a pause.
pub fn ensure_punctuation(text: &str) -> String {
    let text = text.trim();
    match text.chars().last() {
        None => String::new(),
        Some(c) if ".!?,;:".contains(c) => text.to_string(),
        Some(_) => format!("{text},"),
    }
}

/// Split on sentence terminators; sentences longer than `max_len` characters
/// are packed word by word.
pub fn chunk_text(text: &str, max_len: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    for sentence in text.split(['.', '!', '?']).map(str::trim).filter(|s| !s.is_empty()) {
        if sentence.chars().count() <= max_len {
            chunks.push(ensure_punctuation(sentence));
            continue;
        }
        let mut current = String::new();
        let mut current_len = 0;
        for word in sentence.split_whitespace() {
            let word_len = word.chars().count();
            if current_len > 0 && current_len + 1 + word_len > max_len {
                chunks.push(ensure_punctuation(&current));
                current.clear();
                current_len = 0;
            }
            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current.push_str(word);
            current_len += word_len;
        }
        if current_len > 0 {
            chunks.push(ensure_punctuation(&current));
        }
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_short() {
        assert_eq!(chunk_text("Hello world.", CHUNK_MAX_CHARS), vec!["Hello world,"]);
    }

    #[test]
    fn test_chunk_sentences() {
        assert_eq!(chunk_text("Hello. World! Foo?", CHUNK_MAX_CHARS), vec!["Hello,", "World,", "Foo,"]);
    }

    #[test]
    fn test_chunk_long_sentence() {
        let long = "word ".repeat(200);
        let chunks = chunk_text(&long, CHUNK_MAX_CHARS);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= CHUNK_MAX_CHARS + 1, "{} chars", chunk.len());
        }
        let words: usize = chunks.iter().map(|c| c.split_whitespace().count()).sum();
        assert_eq!(words, 200);
    }

    #[test]
    fn test_ensure_punctuation() {
        assert_eq!(ensure_punctuation("hello"), "hello,");
        assert_eq!(ensure_punctuation("hello;"), "hello;");
        assert_eq!(ensure_punctuation("  "), "");
    }

    #[test]
    fn test_disabled_pool_is_unavailable() {
        let cfg = NeuralConfig { enabled: false, ..NeuralConfig::default() };
        let pool = default_pool(&cfg, &OfflineConfig::default());
        let err = pool.ensure_loaded().err().expect("disabled tier should not load");
        assert!(format!("{err:#}").contains("disabled"), "got: {err:#}");
    }

    #[cfg(not(feature = "neural"))]
    #[test]
    fn test_pool_without_feature_is_unavailable() {
        let pool = default_pool(&NeuralConfig::default(), &OfflineConfig::default());
        assert!(pool.ensure_loaded().is_err());
    }
}
