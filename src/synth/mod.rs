//! Speech synthesis with tiered fallback.
//!
//! ```text
//! validate ──► neural ──ok──► export ──► AudioArtifact
//!                │ err
//!                ▼
//!             offline ──ok──► export
//!                │ err / unavailable
//!                ▼
//!             silence ──ok──► export
//!                │ err
//!                ▼
//!         SynthesisError::Exhausted
//! ```
//!
//! Blank text is the only input error; it is reported before any tier runs.
//! Tier failures are logged and never reach the caller.  Every tier ends in
//! the same export step ([`crate::audio::canonicalize`]), so the artifact is
//! mono MP3 at the configured rate whichever tier produced it.

pub mod offline;

use std::{
    fmt,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::{
    audio::{canonicalize, AudioClip, OutputFormat},
    config::{EchoConfig, SynthesisConfig},
    error::SynthesisError,
    neural::{self, NeuralSynthesizer},
    pool::ResourcePool,
    preprocess::normalize_for_speech,
};

pub use offline::{EspeakEngine, OfflineEngine};

/// Appended to text cut at the character cap.
pub const TRUNCATION_MARKER: &str = " …";

/// Bounds applied to the caller's rate factor.
pub const RATE_FACTOR_MIN: f32 = 0.6;
pub const RATE_FACTOR_MAX: f32 = 1.6;

// ─────────────────────────────────────────────────────────────────────────────
// Request / artifact types
// ─────────────────────────────────────────────────────────────────────────────

/// Fixed voice identifiers.  `VoiceA` and `VoiceB` pick the first and second
/// voice an engine offers; anything else gets the engine default.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum VoiceLabel {
    #[default]
    VoiceA,
    VoiceB,
    Other(String),
}

impl VoiceLabel {
    /// Whitespace is ignored, so "Voice A - Warm & Natural" is `VoiceA`.
    pub fn parse(label: &str) -> Self {
        let compact: String = label.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.contains("VoiceA") {
            VoiceLabel::VoiceA
        } else if compact.contains("VoiceB") {
            VoiceLabel::VoiceB
        } else {
            VoiceLabel::Other(label.trim().to_string())
        }
    }

    pub fn ordinal(&self) -> Option<usize> {
        match self {
            VoiceLabel::VoiceA => Some(0),
            VoiceLabel::VoiceB => Some(1),
            VoiceLabel::Other(_) => None,
        }
    }

    /// The voice this label selects from `voices`, if any.
    pub fn pick<'a>(&self, voices: &'a [String]) -> Option<&'a str> {
        self.ordinal().and_then(|i| voices.get(i)).map(String::as_str)
    }
}

impl fmt::Display for VoiceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoiceLabel::VoiceA => f.write_str("VoiceA"),
            VoiceLabel::VoiceB => f.write_str("VoiceB"),
            VoiceLabel::Other(label) => f.write_str(label),
        }
    }
}

/// Which tier produced an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Neural,
    Offline,
    Silent,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Tier::Neural => "neural",
            Tier::Offline => "offline",
            Tier::Silent => "silent",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice: VoiceLabel,
    pub rate_factor: f32,
    /// Write here instead of the configured canonical path.
    pub output: Option<PathBuf>,
}

impl SynthesisRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), voice: VoiceLabel::default(), rate_factor: 1.0, output: None }
    }

    pub fn voice(mut self, voice: VoiceLabel) -> Self {
        self.voice = voice;
        self
    }

    pub fn rate(mut self, rate_factor: f32) -> Self {
        self.rate_factor = rate_factor;
        self
    }

    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }
}

/// The MP3 written by a synthesis call.  `bytes` is exactly the file content.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioArtifact {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
    pub tier: Tier,
}

// ─────────────────────────────────────────────────────────────────────────────
// Text preparation
// ─────────────────────────────────────────────────────────────────────────────

/// Trim, reject blank input, and cut to `max_chars` characters plus
/// [`TRUNCATION_MARKER`].
pub fn prepare_text(text: &str, max_chars: usize) -> Result<String, SynthesisError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(SynthesisError::EmptyText);
    }
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => Ok(format!("{}{TRUNCATION_MARKER}", &text[..cut])),
        None => Ok(text.to_string()),
    }
}

/// Clamp to `[0.6, 1.6]`; NaN reads as 1.0.
pub fn clamp_rate(rate_factor: f32) -> f32 {
    if rate_factor.is_nan() {
        1.0
    } else {
        rate_factor.clamp(RATE_FACTOR_MIN, RATE_FACTOR_MAX)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Synthesizer
// ─────────────────────────────────────────────────────────────────────────────

pub struct Synthesizer {
    neural: ResourcePool<Box<dyn NeuralSynthesizer>>,
    offline: Option<Box<dyn OfflineEngine>>,
    cfg: SynthesisConfig,
}

impl Synthesizer {
    pub fn new(
        neural: ResourcePool<Box<dyn NeuralSynthesizer>>,
        offline: Option<Box<dyn OfflineEngine>>,
        cfg: SynthesisConfig,
    ) -> Self {
        Self { neural, offline, cfg }
    }

    pub fn from_config(cfg: &EchoConfig) -> Self {
        Self::new(
            neural::default_pool(&cfg.neural, &cfg.offline),
            Some(Box::new(EspeakEngine::from_config(&cfg.offline))),
            cfg.synthesis.clone(),
        )
    }

    pub fn output_format(&self) -> OutputFormat {
        OutputFormat { sample_rate: self.cfg.sample_rate, bitrate_kbps: self.cfg.bitrate_kbps }
    }

    /// Run the tier chain.  Fails only on blank text or when even the silent
    /// placeholder cannot be written.
    pub fn synthesize(&self, req: &SynthesisRequest) -> Result<AudioArtifact, SynthesisError> {
        let prepared = prepare_text(&req.text, self.cfg.max_chars)?;
        let text = normalize_for_speech(&prepared);
        let out = req.output.clone().unwrap_or_else(|| self.cfg.output_path.clone());
        let speed = clamp_rate(req.rate_factor);

        info!("Synthesizing {} chars with {} at x{speed:.2}", text.chars().count(), req.voice);

        match self.try_neural(&text, &req.voice, speed, &out) {
            Ok(artifact) => return Ok(artifact),
            Err(e) => warn!("Neural tier ({}) failed: {e:#}", self.neural.name()),
        }
        match self.try_offline(&text, &req.voice, speed, &out) {
            Ok(artifact) => return Ok(artifact),
            Err(e) => warn!("Offline tier failed: {e:#}"),
        }
        self.try_silent(&out).map_err(|e| {
            error!("Silent tier failed: {e:#}");
            SynthesisError::Exhausted { reason: format!("{e:#}") }
        })
    }

    fn try_neural(&self, text: &str, voice: &VoiceLabel, speed: f32, out: &Path) -> Result<AudioArtifact> {
        let model = self.neural.ensure_loaded()?;
        let wave = model.synthesize(text, voice, speed)?;
        anyhow::ensure!(!wave.samples.is_empty(), "neural model returned no audio");
        self.export(AudioClip::mono(wave.samples, wave.sample_rate), out, Tier::Neural)
    }

    fn try_offline(&self, text: &str, voice: &VoiceLabel, speed: f32, out: &Path) -> Result<AudioArtifact> {
        let engine = self.offline.as_deref().context("no offline engine configured")?;
        if !engine.is_available() {
            anyhow::bail!("{} is not available", engine.name());
        }

        let voices = engine.voices().unwrap_or_else(|e| {
            warn!("Cannot list {} voices, using its default: {e:#}", engine.name());
            Vec::new()
        });
        let selected = voice.pick(&voices);
        let rate = (engine.base_rate() as f32 * speed).round() as u32;

        let scratch = tempfile::Builder::new()
            .prefix("echoverse-")
            .tempdir()
            .context("Cannot create scratch directory")?;
        let wav = scratch.path().join("offline.wav");
        engine.render_to_file(text, selected, rate, &wav)?;
        let clip = AudioClip::from_wav(&wav)?;
        self.export(clip, out, Tier::Offline)
    }

    fn try_silent(&self, out: &Path) -> Result<AudioArtifact> {
        let clip = AudioClip::silent(self.cfg.silence_ms, self.cfg.sample_rate);
        self.export(clip, out, Tier::Silent)
    }

    /// Canonicalise `clip` and write it to `out`, creating parent directories.
    fn export(&self, clip: AudioClip, out: &Path, tier: Tier) -> Result<AudioArtifact> {
        let secs = clip.duration_secs();
        let bytes = canonicalize(clip, self.output_format())?;
        if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create output directory {}", parent.display()))?;
        }
        std::fs::write(out, &bytes).with_context(|| format!("Cannot write {}", out.display()))?;
        info!("Wrote {secs:.2}s of {tier} audio ({} bytes) to {}", bytes.len(), out.display());
        Ok(AudioArtifact { path: out.to_path_buf(), bytes, tier })
    }
}

impl fmt::Debug for Synthesizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Synthesizer")
            .field("neural", &self.neural)
            .field("offline", &self.offline.as_ref().map(|e| e.name().to_string()))
            .field("cfg", &self.cfg)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
