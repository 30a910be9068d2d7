//! Table-driven tone rewriter.
//!
//! 1. **Vocabulary**: each mapped word found as a whole word (any case) is
//!    replaced everywhere by one candidate drawn once per call.
//! 2. **Restructure**: split on `.` `!` `?`, then add connectors, dramatic
//!    pauses and filler sentences with the tone's probabilities.
//! 3. **Join**: capitalise each sentence, join with `". "`, end with `.`.
//! 4. **Cleanup**: squeeze whitespace and period runs.
//!
//! The random source is a parameter so a seeded generator pins the output.

use once_cell::sync::Lazy;
use rand::{seq::SliceRandom, Rng};
use regex::Regex;

use crate::tone::{Restructure, Tone, ToneProfile};

static RE_SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]+").unwrap());
static RE_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static RE_DOTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.+").unwrap());
static RE_SPACED_DOTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.\s*\.").unwrap());

/// Stateless rule-based rewriter over the static tone tables.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleRewriter;

impl RuleRewriter {
    pub fn new() -> Self {
        Self
    }

    /// Rewrite with the thread-local generator.
    pub fn rewrite(&self, text: &str, tone: Tone) -> String {
        self.rewrite_with_rng(text, tone, &mut rand::thread_rng())
    }

    /// Rewrite `text` drawing every random decision from `rng`.
    ///
    /// Blank input yields an empty string; anything else yields at least `"."`.
    pub fn rewrite_with_rng<R: Rng + ?Sized>(&self, text: &str, tone: Tone, rng: &mut R) -> String {
        if text.trim().is_empty() {
            return String::new();
        }
        let profile = tone.profile();

        let substituted = substitute_vocabulary(text, profile, rng);
        let sentences = restructure(&substituted, profile, rng);

        let joined = sentences
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| capitalize_first(s))
            .collect::<Vec<_>>()
            .join(". ");

        cleanup(&format!("{joined}."))
    }
}

/// Replace every mapped word with one randomly chosen candidate.
pub fn substitute_vocabulary<R: Rng + ?Sized>(text: &str, profile: &ToneProfile, rng: &mut R) -> String {
    let mut result = text.to_string();
    for sub in &profile.vocabulary {
        if !sub.pattern.is_match(&result) {
            continue;
        }
        let Some(&replacement) = sub.candidates.choose(rng) else {
            continue;
        };
        // NoExpand: candidates are literal text, never capture references.
        result = sub
            .pattern
            .replace_all(&result, regex::NoExpand(replacement))
            .into_owned();
    }
    result
}

/// Split on sentence terminators, trimming and dropping empty fragments.
pub fn split_sentences(text: &str) -> Vec<String> {
    RE_SENTENCE_END
        .split(text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn restructure<R: Rng + ?Sized>(text: &str, profile: &ToneProfile, rng: &mut R) -> Vec<String> {
    let sentences = split_sentences(text);

    match profile.restructure {
        Restructure::PerSentence { connectors, connector_p, ellipsis, filler_p } => {
            let mut out = Vec::with_capacity(sentences.len() * 2);
            for (i, mut sentence) in sentences.into_iter().enumerate() {
                if i > 0 && rng.gen::<f64>() < connector_p {
                    if let Some(connector) = connectors.choose(rng) {
                        sentence = format!("{connector}, {sentence}");
                    }
                }
                if let Some((pause_p, min_len)) = ellipsis {
                    // Drawn before the length check.
                    if rng.gen::<f64>() < pause_p && sentence.chars().count() > min_len {
                        sentence.push_str("...");
                    }
                }
                out.push(sentence);
                if rng.gen::<f64>() < filler_p {
                    if let Some(filler) = profile.fillers.choose(rng) {
                        out.push((*filler).to_string());
                    }
                }
            }
            out
        }
        Restructure::Closing { filler_p } => {
            let mut out = sentences;
            if rng.gen::<f64>() < filler_p {
                if let Some(filler) = profile.fillers.choose(rng) {
                    out.push((*filler).to_string());
                }
            }
            out
        }
    }
}

fn capitalize_first(sentence: &str) -> String {
    let mut chars = sentence.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn cleanup(text: &str) -> String {
    let text = RE_SPACES.replace_all(text.trim(), " ");
    let text = RE_DOTS.replace_all(&text, ".");
    RE_SPACED_DOTS.replace_all(&text, ".").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn has_period_run(s: &str) -> bool {
        s.contains("..")
    }

    #[test]
    fn test_blank_input_is_empty() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(RuleRewriter::new().rewrite_with_rng("", Tone::Suspenseful, &mut rng), "");
        assert_eq!(RuleRewriter::new().rewrite_with_rng(" \n\t ", Tone::Inspiring, &mut rng), "");
    }

    #[test]
    fn test_cat_on_mat_keeps_content() {
        for seed in 0..32 {
            let mut rng = StdRng::seed_from_u64(seed);
            let out = RuleRewriter::new().rewrite_with_rng("The cat sat on the mat.", Tone::Suspenseful, &mut rng);
            assert!(!out.is_empty());
            assert!(out.ends_with('.'), "seed {seed}: {out}");
            assert!(!has_period_run(&out), "seed {seed}: {out}");
            assert!(out.to_lowercase().contains("cat sat on the mat"), "seed {seed}: {out}");
        }
    }

    #[test]
    fn test_same_seed_same_output() {
        let text = "He walked home. It was dark! Nobody said a word? The problem happened quickly.";
        let a = RuleRewriter::new().rewrite_with_rng(text, Tone::Suspenseful, &mut StdRng::seed_from_u64(42));
        let b = RuleRewriter::new().rewrite_with_rng(text, Tone::Suspenseful, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_trailing_period_and_no_runs_for_all_tones() {
        let text = "Wait... what?! She said it was big. The end";
        for tone in Tone::ALL {
            for seed in 0..50 {
                let out = RuleRewriter::new().rewrite_with_rng(text, tone, &mut StdRng::seed_from_u64(seed));
                assert!(out.ends_with('.'), "{tone} seed {seed}: {out}");
                assert!(!has_period_run(&out), "{tone} seed {seed}: {out}");
            }
        }
    }

    #[test]
    fn test_vocabulary_replaces_all_occurrences_with_one_choice() {
        let profile = Tone::Suspenseful.profile();
        let out = substitute_vocabulary("Said once, said twice, SAID thrice.", profile, &mut StdRng::seed_from_u64(3));
        assert!(!out.to_lowercase().contains("said"), "got: {out}");
        let candidates = profile.vocabulary[0].candidates;
        let chosen = candidates
            .iter()
            .find(|c| out.contains(**c))
            .expect("one candidate should appear");
        assert_eq!(out.matches(chosen).count(), 3, "got: {out}");
    }

    #[test]
    fn test_vocabulary_respects_word_boundaries() {
        let out = substitute_vocabulary("It went unsaid", Tone::Suspenseful.profile(), &mut StdRng::seed_from_u64(0));
        assert_eq!(out, "It went unsaid");
    }

    #[test]
    fn test_neutral_keeps_sentences_and_may_close_with_filler() {
        let fillers = Tone::Neutral.profile().fillers;
        for seed in 0..40 {
            let out = RuleRewriter::new().rewrite_with_rng("first point. second point", Tone::Neutral, &mut StdRng::seed_from_u64(seed));
            assert!(out.starts_with("First point. Second point."), "seed {seed}: {out}");
            let rest = out["First point. Second point.".len()..].trim();
            assert!(rest.is_empty() || fillers.iter().any(|f| *f == rest), "seed {seed}: {out}");
        }
    }

    #[test]
    fn test_first_sentence_never_gets_connector() {
        for seed in 0..40 {
            let out = RuleRewriter::new().rewrite_with_rng("alpha beta. gamma delta", Tone::Inspiring, &mut StdRng::seed_from_u64(seed));
            assert!(out.starts_with("Alpha beta"), "seed {seed}: {out}");
        }
    }

    #[test]
    fn test_split_sentences_drops_empties() {
        assert_eq!(split_sentences("One. Two!! Three?..  "), vec!["One", "Two", "Three"]);
        assert!(split_sentences("...").is_empty());
    }

    #[test]
    fn test_only_punctuation_still_non_empty() {
        let out = RuleRewriter::new().rewrite_with_rng("?!", Tone::Neutral, &mut StdRng::seed_from_u64(9));
        assert!(!out.is_empty());
        assert!(out.ends_with('.'));
    }

    #[test]
    fn test_cleanup_squeezes() {
        assert_eq!(cleanup("a   b.... c. . d."), "a b. c. d.");
    }
}
