//! # echoverse
//!
//! Tone-adaptive narration: rewrite text in a chosen tone, then speak it.
//!
//! ## Quick start
//!
//! ```no_run
//! use echoverse::{Tone, rewrite, synthesize};
//!
//! let story = rewrite("The door opened. A figure stepped in.", Tone::Suspenseful);
//! let mp3 = synthesize(&story, "VoiceA", 1.0).unwrap();
//! println!("{}", mp3.display());
//! ```
//!
//! For explicit configuration, seeded randomness or per-call output paths,
//! build an [`Echoverse`] from an [`EchoConfig`].
//!
//! ## Pipeline
//! 1. **Routing**: under 50 words → rule-based rewrite, otherwise the
//!    generative model ([`rewrite::Route`]).
//! 2. **Normalisation**: digits → words, `St.`/`Mr.`/`Dr.`/`&` expanded
//!    ([`preprocess::normalize_for_speech`]).
//! 3. **Synthesis**: neural → offline (espeak-ng) → silence, first success
//!    wins ([`synth::Synthesizer`]).
//! 4. **Export**: mono, 16 kHz, peak-normalised MP3 ([`audio::canonicalize`]).

pub mod audio;
pub mod config;
pub mod error;
pub mod ffi;
pub mod neural;
pub mod pool;
pub mod preprocess;
pub mod rewrite;
pub mod synth;
pub mod tone;

use std::path::PathBuf;

use once_cell::sync::Lazy;
use tracing::warn;

// ─── Re-exports for convenience ─────────────────────────────────────────────

pub use config::EchoConfig;
pub use error::{ConfigError, SynthesisError};
pub use rewrite::{RewriteOutcome, Rewriter};
pub use synth::{AudioArtifact, SynthesisRequest, Synthesizer, Tier, VoiceLabel};
pub use tone::Tone;

// ─────────────────────────────────────────────────────────────────────────────
// Echoverse
// ─────────────────────────────────────────────────────────────────────────────

/// Result of [`Echoverse::narrate`].
#[derive(Debug, Clone, PartialEq)]
pub struct Narration {
    pub rewrite: RewriteOutcome,
    pub audio: AudioArtifact,
}

/// Rewriter and synthesizer behind one handle.
#[derive(Debug)]
pub struct Echoverse {
    rewriter: Rewriter,
    synthesizer: Synthesizer,
}

impl Echoverse {
    pub fn new(rewriter: Rewriter, synthesizer: Synthesizer) -> Self {
        Self { rewriter, synthesizer }
    }

    pub fn from_config(cfg: &EchoConfig) -> Self {
        Self::new(Rewriter::from_config(cfg), Synthesizer::from_config(cfg))
    }

    pub fn rewrite(&self, text: &str, tone: Tone) -> RewriteOutcome {
        self.rewriter.rewrite(text, tone)
    }

    pub fn synthesize(&self, request: &SynthesisRequest) -> Result<AudioArtifact, SynthesisError> {
        self.synthesizer.synthesize(request)
    }

    /// Rewrite, then speak the result.  A degraded rewrite speaks the
    /// original text rather than the failure message.
    pub fn narrate(
        &self,
        text: &str,
        tone: Tone,
        voice: VoiceLabel,
        rate_factor: f32,
    ) -> Result<Narration, SynthesisError> {
        let rewrite = self.rewrite(text, tone);
        let script = match &rewrite {
            RewriteOutcome::Rewritten(rewritten) => rewritten.as_str(),
            RewriteOutcome::Degraded { reason } => {
                warn!("Narrating the original text, rewrite degraded: {reason}");
                text
            }
        };
        let request = SynthesisRequest::new(script).voice(voice).rate(rate_factor);
        let audio = self.synthesize(&request)?;
        Ok(Narration { rewrite, audio })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Process-wide instance
// ─────────────────────────────────────────────────────────────────────────────

static SHARED: Lazy<Echoverse> = Lazy::new(|| {
    let cfg = EchoConfig::load(None).unwrap_or_else(|e| {
        warn!("{e}; using default configuration");
        EchoConfig::default()
    });
    Echoverse::from_config(&cfg)
});

/// The instance used by [`rewrite()`] and [`synthesize()`], configured from
/// the standard config locations on first use.
pub fn shared() -> &'static Echoverse {
    &SHARED
}

/// Rewrite `text` in `tone`.  Blank input gives an empty string; a failed
/// model rewrite gives [`rewrite::DEGRADED_MESSAGE`].
pub fn rewrite(text: &str, tone: Tone) -> String {
    shared().rewrite(text, tone).into_text()
}

/// Speak `text` to the canonical MP3 path and return that path.
pub fn synthesize(text: &str, voice: &str, rate_factor: f32) -> Result<PathBuf, SynthesisError> {
    let request = SynthesisRequest::new(text).voice(VoiceLabel::parse(voice)).rate(rate_factor);
    shared().synthesize(&request).map(|artifact| artifact.path)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::SynthesisConfig,
        pool::ResourcePool,
        rewrite::{model::tests::fake_rewriter, GenerationParams, ModelRewriter},
        synth::tests::sine_neural,
    };

    fn synth_in(dir: &std::path::Path) -> (Synthesizer, std::sync::Arc<std::sync::Mutex<Vec<(String, VoiceLabel, f32)>>>) {
        let (neural, calls) = sine_neural();
        let cfg = SynthesisConfig { output_path: dir.join("out.mp3"), ..SynthesisConfig::default() };
        (Synthesizer::new(neural, None, cfg), calls)
    }

    #[test]
    fn test_narrate_speaks_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        let (synth, calls) = synth_in(dir.path());
        let app = Echoverse::new(Rewriter::new(fake_rewriter("unused").0, Some(3)), synth);

        let narration = app.narrate("The cat sat on the mat.", Tone::Neutral, VoiceLabel::VoiceA, 1.0).unwrap();
        let spoken = &calls.lock().unwrap()[0].0;
        assert_eq!(spoken, narration.rewrite.text());
        assert_eq!(narration.audio.tier, Tier::Neural);
        assert!(narration.audio.path.exists());
    }

    #[test]
    fn test_degraded_rewrite_narrates_original() {
        let dir = tempfile::tempdir().unwrap();
        let (synth, calls) = synth_in(dir.path());
        let model = ModelRewriter::new(ResourcePool::unavailable("model", "offline"), GenerationParams::default());
        let app = Echoverse::new(Rewriter::new(model, None), synth);

        let text = vec!["story"; 60].join(" ");
        let narration = app.narrate(&text, Tone::Inspiring, VoiceLabel::VoiceB, 1.0).unwrap();
        assert!(narration.rewrite.is_degraded());
        assert_eq!(calls.lock().unwrap()[0].0, text);
    }

    #[test]
    fn test_narrate_blank_is_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let (synth, _) = synth_in(dir.path());
        let app = Echoverse::new(Rewriter::new(fake_rewriter("unused").0, None), synth);
        let err = app.narrate("  ", Tone::Suspenseful, VoiceLabel::VoiceA, 1.0).unwrap_err();
        assert!(matches!(err, SynthesisError::EmptyText));
    }

    #[test]
    fn test_free_rewrite_blank() {
        assert_eq!(rewrite("   ", Tone::Inspiring), "");
    }

    #[test]
    fn test_free_synthesize_blank() {
        assert!(matches!(synthesize("", "VoiceA", 1.0), Err(SynthesisError::EmptyText)));
    }
}
