//! Generative-model rewriter for long inputs.
//!
//! Builds a chat-style instruction prompt carrying the tone and the literal
//! text, samples a completion, and keeps only what follows the assistant turn
//! marker.  The backend is loaded on first use through a [`ResourcePool`].
//!
//! Any load or generation failure becomes [`RewriteOutcome::Degraded`]; it is
//! never propagated as an error.

use anyhow::Result;
use tracing::{debug, warn};

use crate::{config::ModelConfig, pool::ResourcePool, rewrite::RewriteOutcome, tone::Tone};

/// Marker after which the model's answer starts.
pub const ASSISTANT_MARKER: &str = "<|assistant|>";

/// Sampling parameters sent with every generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub top_p: f32,
    pub max_new_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self::from(&ModelConfig::default())
    }
}

impl From<&ModelConfig> for GenerationParams {
    fn from(cfg: &ModelConfig) -> Self {
        Self {
            temperature: cfg.temperature,
            top_p: cfg.top_p,
            max_new_tokens: cfg.max_new_tokens,
        }
    }
}

/// A generative language model: prompt in, decoded text out.
pub trait TextGenerator: Send + Sync {
    fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String>;
}

/// Compose the tone-conditioned instruction prompt.
pub fn build_prompt(text: &str, tone: Tone) -> String {
    format!(
        "<|system|>\n\
         You are a helpful assistant that rewrites text to a specific tone.\n\
         The user will provide you with a tone and a piece of text.\n\
         You must rewrite the text using descriptive language and without summarizing the original content.\n\
         The tone should be {tone}.\n\
         </s>\n\
         <|user|>\n\
         Rewrite the following text: {text}\n\
         </s>\n\
         {ASSISTANT_MARKER}\n"
    )
}

/// Keep the segment after the last assistant marker, trimmed.
///
/// Backends that echo the prompt and backends that return only the
/// completion both come out the same.
pub fn extract_completion(decoded: &str) -> &str {
    decoded.rsplit(ASSISTANT_MARKER).next().unwrap_or(decoded).trim()
}

pub struct ModelRewriter {
    generator: ResourcePool<Box<dyn TextGenerator>>,
    params: GenerationParams,
}

impl ModelRewriter {
    pub fn new(generator: ResourcePool<Box<dyn TextGenerator>>, params: GenerationParams) -> Self {
        Self { generator, params }
    }

    /// Rewriter backed by the HTTP inference client described by `cfg`.
    pub fn from_config(cfg: &ModelConfig) -> Self {
        let client_cfg = cfg.clone();
        let pool = ResourcePool::new("text generation model", move || {
            let client = crate::rewrite::hf::HfInferenceClient::from_config(&client_cfg)?;
            Ok(Box::new(client) as Box<dyn TextGenerator>)
        });
        Self::new(pool, GenerationParams::from(cfg))
    }

    pub fn is_loaded(&self) -> bool {
        self.generator.is_loaded()
    }

    pub fn rewrite(&self, text: &str, tone: Tone) -> RewriteOutcome {
        if text.trim().is_empty() {
            return RewriteOutcome::Rewritten(String::new());
        }
        match self.try_rewrite(text, tone) {
            Ok(rewritten) => RewriteOutcome::Rewritten(rewritten),
            Err(e) => {
                warn!("Model rewrite failed: {e:#}");
                RewriteOutcome::Degraded { reason: format!("{e:#}") }
            }
        }
    }

    fn try_rewrite(&self, text: &str, tone: Tone) -> Result<String> {
        let generator = self.generator.ensure_loaded()?;
        let prompt = build_prompt(text, tone);
        debug!("Model prompt: {} chars, tone {tone}", prompt.len());

        let decoded = generator.generate(&prompt, &self.params)?;
        let completion = extract_completion(&decoded);
        if completion.is_empty() {
            anyhow::bail!("model returned an empty completion");
        }
        Ok(completion.to_string())
    }
}

impl std::fmt::Debug for ModelRewriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRewriter")
            .field("generator", &self.generator)
            .field("params", &self.params)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Records prompts and answers with a fixed reply (echoing the prompt
    /// first, like a local decoder would).
    pub(crate) struct EchoingGenerator {
        pub reply: String,
        pub prompts: Arc<Mutex<Vec<String>>>,
    }

    impl TextGenerator for EchoingGenerator {
        fn generate(&self, prompt: &str, _params: &GenerationParams) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(format!("{prompt}{}", self.reply))
        }
    }

    pub(crate) fn fake_rewriter(reply: &str) -> (ModelRewriter, Arc<Mutex<Vec<String>>>) {
        let prompts = Arc::new(Mutex::new(Vec::new()));
        let shared = Arc::clone(&prompts);
        let reply = reply.to_string();
        let pool = ResourcePool::new("fake model", move || {
            Ok(Box::new(EchoingGenerator { reply: reply.clone(), prompts: Arc::clone(&shared) })
                as Box<dyn TextGenerator>)
        });
        (ModelRewriter::new(pool, GenerationParams::default()), prompts)
    }

    #[test]
    fn test_prompt_embeds_tone_and_text() {
        let prompt = build_prompt("The storm passed.", Tone::Inspiring);
        assert!(prompt.contains("The tone should be Inspiring."));
        assert!(prompt.contains("Rewrite the following text: The storm passed."));
        assert!(prompt.trim_end().ends_with(ASSISTANT_MARKER));
    }

    #[test]
    fn test_extract_completion_after_last_marker() {
        assert_eq!(extract_completion("prompt <|assistant|>\n  A new dawn.  "), "A new dawn.");
        assert_eq!(extract_completion("  bare completion "), "bare completion");
    }

    #[test]
    fn test_rewrite_returns_completion() {
        let (rewriter, prompts) = fake_rewriter("  A brighter tale.  ");
        let out = rewriter.rewrite("A tale.", Tone::Inspiring);
        assert_eq!(out, RewriteOutcome::Rewritten("A brighter tale.".into()));
        assert_eq!(prompts.lock().unwrap().len(), 1);
        assert!(rewriter.is_loaded());
    }

    #[test]
    fn test_blank_input_skips_model() {
        let (rewriter, prompts) = fake_rewriter("unused");
        assert_eq!(rewriter.rewrite("   ", Tone::Neutral), RewriteOutcome::Rewritten(String::new()));
        assert!(prompts.lock().unwrap().is_empty());
        assert!(!rewriter.is_loaded());
    }

    #[test]
    fn test_load_failure_degrades() {
        let pool = ResourcePool::unavailable("model", "HUGGING_FACE_TOKEN is not set");
        let rewriter = ModelRewriter::new(pool, GenerationParams::default());
        match rewriter.rewrite("Some text.", Tone::Suspenseful) {
            RewriteOutcome::Degraded { reason } => assert!(reason.contains("HUGGING_FACE_TOKEN"), "got: {reason}"),
            other => panic!("expected degraded, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_completion_degrades() {
        let (rewriter, _) = fake_rewriter("   ");
        assert!(matches!(rewriter.rewrite("Some text.", Tone::Neutral), RewriteOutcome::Degraded { .. }));
    }

    #[test]
    fn test_generation_params_from_config() {
        let params = GenerationParams::default();
        assert_eq!(params.max_new_tokens, 512);
        assert!((params.temperature - 0.7).abs() < f32::EPSILON);
        assert!((params.top_p - 0.9).abs() < f32::EPSILON);
    }
}
