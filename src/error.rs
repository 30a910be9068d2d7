//! Error types surfaced to callers.
//!
//! Everything below the public operations runs on `anyhow::Result`; only the
//! failures a caller is expected to branch on get a named variant here.

use std::path::PathBuf;

use thiserror::Error;

/// Hard failures of [`crate::synth::Synthesizer::synthesize`].
///
/// Every other problem (model missing, engine absent, encode error in one
/// tier) is absorbed by the fallback chain.
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// The text was empty or whitespace-only.  No tier is attempted.
    #[error("no text provided for speech synthesis")]
    EmptyText,

    /// Every tier failed, including the silent placeholder.
    #[error("speech synthesis failed, and the silent fallback failed: {reason}")]
    Exhausted { reason: String },
}

/// Errors while loading an [`crate::config::EchoConfig`] file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausted_message_carries_reason() {
        let err = SynthesisError::Exhausted { reason: "disk full".into() };
        assert!(err.to_string().contains("disk full"), "got: {err}");
    }

    #[test]
    fn test_empty_text_message() {
        assert_eq!(
            SynthesisError::EmptyText.to_string(),
            "no text provided for speech synthesis"
        );
    }
}
