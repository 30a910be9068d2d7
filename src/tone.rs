//! Tone tables: word substitutions, discourse connectors, filler sentences
//! and the per-sentence probabilities that drive the rule-based rewriter.
//!
//! All tables are `'static` data, built once and shared read-only.

use std::{fmt, str::FromStr};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Narrative style requested for a rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Tone {
    #[default]
    Neutral,
    Suspenseful,
    Inspiring,
}

impl Tone {
    pub const ALL: [Tone; 3] = [Tone::Neutral, Tone::Suspenseful, Tone::Inspiring];

    pub fn as_str(self) -> &'static str {
        match self {
            Tone::Neutral => "Neutral",
            Tone::Suspenseful => "Suspenseful",
            Tone::Inspiring => "Inspiring",
        }
    }

    /// Parse a tone name, treating anything unrecognised as [`Tone::Neutral`].
    ///
    /// An unknown tone has no vocabulary map and restructures like Neutral,
    /// so mapping it to Neutral is exact.
    pub fn from_label(label: &str) -> Tone {
        label.parse().unwrap_or_else(|_| {
            tracing::warn!("Unknown tone {label:?}, using Neutral");
            Tone::Neutral
        })
    }

    pub fn profile(self) -> &'static ToneProfile {
        match self {
            Tone::Neutral => &NEUTRAL,
            Tone::Suspenseful => &SUSPENSEFUL,
            Tone::Inspiring => &INSPIRING,
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTone(pub String);

impl fmt::Display for UnknownTone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown tone '{}' (expected Neutral, Suspenseful or Inspiring)", self.0)
    }
}

impl std::error::Error for UnknownTone {}

impl FromStr for Tone {
    type Err = UnknownTone;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "neutral" => Ok(Tone::Neutral),
            "suspenseful" => Ok(Tone::Suspenseful),
            "inspiring" => Ok(Tone::Inspiring),
            _ => Err(UnknownTone(s.to_string())),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Profiles
// ─────────────────────────────────────────────────────────────────────────────

/// How sentences are restructured for a tone.
#[derive(Debug, Clone, PartialEq)]
pub enum Restructure {
    /// Walk every sentence: maybe prepend a connector (never on the first
    /// sentence), maybe append a dramatic ellipsis, maybe insert a filler
    /// sentence right after it.
    PerSentence {
        connectors: &'static [&'static str],
        connector_p: f64,
        /// `(probability, minimum sentence length)`; `None` disables the pause.
        ellipsis: Option<(f64, usize)>,
        filler_p: f64,
    },
    /// Keep sentences as they are; maybe append one filler at the very end.
    Closing { filler_p: f64 },
}

/// One substitution rule: a whole-word, case-insensitive pattern and the
/// candidates one of which replaces every occurrence.
#[derive(Debug)]
pub struct Substitution {
    pub word: &'static str,
    pub pattern: Regex,
    pub candidates: &'static [&'static str],
}

impl Substitution {
    fn new(word: &'static str, candidates: &'static [&'static str]) -> Self {
        let pattern = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(word)))
            .expect("substitution pattern is a literal word");
        Self { word, pattern, candidates }
    }
}

/// Immutable tables for one tone.
#[derive(Debug)]
pub struct ToneProfile {
    pub tone: Tone,
    /// Applied in this order; later rules see earlier substitutions.
    pub vocabulary: Vec<Substitution>,
    pub fillers: &'static [&'static str],
    pub restructure: Restructure,
}

type WordTable = &'static [(&'static str, &'static [&'static str])];

fn build(tone: Tone, words: WordTable, fillers: &'static [&'static str], restructure: Restructure) -> ToneProfile {
    ToneProfile {
        tone,
        vocabulary: words.iter().map(|&(w, c)| Substitution::new(w, c)).collect(),
        fillers,
        restructure,
    }
}

const SUSPENSEFUL_WORDS: WordTable = &[
    ("said", &["whispered", "murmured", "declared ominously", "breathed"]),
    ("walked", &["crept", "stalked", "moved stealthily", "prowled"]),
    ("looked", &["peered", "gazed intently", "scrutinized", "observed carefully"]),
    ("found", &["discovered", "uncovered", "stumbled upon", "revealed"]),
    ("big", &["enormous", "massive", "towering", "immense"]),
    ("small", &["tiny", "minuscule", "barely visible", "microscopic"]),
    ("dark", &["pitch-black", "shadowy", "ominous", "forbidding"]),
    ("quiet", &["eerily silent", "deathly quiet", "hushed", "soundless"]),
    ("started", &["began mysteriously", "commenced ominously", "initiated"]),
    ("happened", &["unfolded", "materialized", "emerged", "manifested"]),
    ("problem", &["mystery", "enigma", "dark secret", "hidden truth"]),
    ("important", &["crucial", "vital", "critical", "pivotal"]),
    ("quickly", &["swiftly", "in a flash", "instantaneously", "like lightning"]),
];

const INSPIRING_WORDS: WordTable = &[
    ("said", &["proclaimed", "declared with passion", "shared enthusiastically", "announced boldly"]),
    ("walked", &["strode confidently", "marched forward", "stepped with purpose", "advanced courageously"]),
    ("looked", &["envisioned", "gazed with hope", "focused intently", "observed with clarity"]),
    ("found", &["achieved", "accomplished", "realized", "attained"]),
    ("big", &["magnificent", "extraordinary", "remarkable", "outstanding"]),
    ("small", &["humble yet significant", "precious", "valuable", "meaningful"]),
    ("difficult", &["challenging yet rewarding", "growth-inspiring", "character-building"]),
    ("good", &["exceptional", "remarkable", "outstanding", "extraordinary"]),
    ("bad", &["challenging", "learning opportunity", "growth catalyst", "stepping stone"]),
    ("try", &["commit to", "dedicate yourself to", "embrace", "pursue with passion"]),
    ("work", &["dedicate yourself", "pour your heart into", "commit passionately"]),
    ("help", &["empower", "uplift", "inspire", "transform"]),
    ("success", &["triumph", "breakthrough", "achievement", "victory"]),
    ("change", &["transformation", "evolution", "breakthrough", "metamorphosis"]),
];

const SUSPENSEFUL_FILLERS: &[&str] = &[
    "The air grew thick with mystery.",
    "Something lurked in the shadows.",
    "An eerie silence filled the space.",
    "Time seemed to slow to a crawl.",
    "The darkness held secrets untold.",
];

const INSPIRING_FILLERS: &[&str] = &[
    "This moment sparked infinite possibilities.",
    "Every challenge became a stepping stone to greatness.",
    "The journey toward excellence had begun.",
    "Dreams transformed into unstoppable reality.",
    "Success was no longer a distant hope, but an approaching certainty.",
];

const NEUTRAL_FILLERS: &[&str] = &[
    "The analysis revealed important insights.",
    "Further examination showed significant results.",
    "The data supported comprehensive conclusions.",
    "Multiple factors contributed to the outcome.",
    "The findings demonstrated clear patterns.",
];

const SUSPENSEFUL_CONNECTORS: &[&str] =
    &["suddenly", "without warning", "in that moment", "unexpectedly", "then"];

const INSPIRING_CONNECTORS: &[&str] = &[
    "furthermore",
    "beyond that",
    "even more remarkably",
    "with unwavering determination",
];

static SUSPENSEFUL: Lazy<ToneProfile> = Lazy::new(|| {
    build(
        Tone::Suspenseful,
        SUSPENSEFUL_WORDS,
        SUSPENSEFUL_FILLERS,
        Restructure::PerSentence {
            connectors: SUSPENSEFUL_CONNECTORS,
            connector_p: 0.4,
            ellipsis: Some((0.3, 20)),
            filler_p: 0.25,
        },
    )
});

static INSPIRING: Lazy<ToneProfile> = Lazy::new(|| {
    build(
        Tone::Inspiring,
        INSPIRING_WORDS,
        INSPIRING_FILLERS,
        Restructure::PerSentence {
            connectors: INSPIRING_CONNECTORS,
            connector_p: 0.3,
            ellipsis: None,
            filler_p: 0.3,
        },
    )
});

static NEUTRAL: Lazy<ToneProfile> =
    Lazy::new(|| build(Tone::Neutral, &[], NEUTRAL_FILLERS, Restructure::Closing { filler_p: 0.2 }));
