//! Tone rewriting: the size-based dispatcher over the two rewriters.
//!
//! Inputs under [`MODEL_ROUTE_MIN_WORDS`] whitespace-delimited words go to the
//! rule-based rewriter; everything else goes to the generative model.

pub mod hf;
pub mod model;
pub mod rules;

use std::sync::Mutex;

use rand::{rngs::StdRng, SeedableRng};
use tracing::debug;

use crate::{config::EchoConfig, tone::Tone};

pub use model::{GenerationParams, ModelRewriter, TextGenerator};
pub use rules::RuleRewriter;

/// Word count at which inputs switch to the model path.
pub const MODEL_ROUTE_MIN_WORDS: usize = 50;

/// Text handed back when the model path fails.
pub const DEGRADED_MESSAGE: &str = "An error occurred during text rewriting. Please try again.";

/// Which rewriter handles a given input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Rules,
    Model,
}

impl Route {
    /// Pure function of the whitespace token count.
    pub fn for_text(text: &str) -> Route {
        if text.split_whitespace().count() < MODEL_ROUTE_MIN_WORDS {
            Route::Rules
        } else {
            Route::Model
        }
    }
}

/// Result of a rewrite, keeping genuine output apart from failure text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteOutcome {
    Rewritten(String),
    /// The model path failed; `reason` says why.
    Degraded { reason: String },
}

impl RewriteOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, RewriteOutcome::Degraded { .. })
    }

    /// Plain-text view: the rewritten text, or the fixed apology message.
    pub fn text(&self) -> &str {
        match self {
            RewriteOutcome::Rewritten(text) => text,
            RewriteOutcome::Degraded { .. } => DEGRADED_MESSAGE,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            RewriteOutcome::Rewritten(text) => text,
            RewriteOutcome::Degraded { .. } => DEGRADED_MESSAGE.to_string(),
        }
    }
}

/// The rewrite dispatcher.
pub struct Rewriter {
    rules: RuleRewriter,
    model: ModelRewriter,
    rng: Mutex<StdRng>,
}

impl Rewriter {
    pub fn new(model: ModelRewriter, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rules: RuleRewriter::new(),
            model,
            rng: Mutex::new(rng),
        }
    }

    pub fn from_config(cfg: &EchoConfig) -> Self {
        Self::new(ModelRewriter::from_config(&cfg.model), cfg.rewrite.seed)
    }

    pub fn rewrite(&self, text: &str, tone: Tone) -> RewriteOutcome {
        let route = Route::for_text(text);
        debug!("Rewriting {} words as {tone} via {route:?}", text.split_whitespace().count());
        match route {
            Route::Rules => {
                let mut rng = self.rng.lock().unwrap_or_else(|p| p.into_inner());
                RewriteOutcome::Rewritten(self.rules.rewrite_with_rng(text, tone, &mut *rng))
            }
            Route::Model => self.model.rewrite(text, tone),
        }
    }
}

impl std::fmt::Debug for Rewriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rewriter").field("model", &self.model).finish_non_exhaustive()
    }
}
