//! Lexical slop detection for filtering low-substance generated text.
//!
//! Counts hedging/overused phrasing per 100 words, subtracts concrete
//! quality signals (named benchmarks, ablation/limitation language), and
//! squashes the result to [0, 1].

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::Display;

// Phrases that appear disproportionately in generated academic text.
const SLOP_PHRASES: &[&str] = &[
    // Hedging and filler
    "it is important to note that",
    "it is worth noting that",
    "it should be noted that",
    "in this paper, we",
    "in this work, we",
    "in recent years",
    "has gained significant attention",
    "has attracted considerable attention",
    "has received increasing attention",
    "plays a crucial role",
    "plays a vital role",
    "plays an important role",
    "of paramount importance",
    "pave the way",
    "paves the way",
    "shed light on",
    "sheds light on",
    "leverage the power of",
    "harness the power of",
    "unlock the potential",
    "unlocking the potential",
    "delve into",
    "delve deeper",
    "delves into",
    // Overused paper phrases
    "comprehensive evaluation",
    "extensive experiments",
    "extensive evaluations",
    "rigorous evaluation",
    "thorough evaluation",
    "comprehensive analysis",
    "comprehensive study",
    "comprehensive framework",
    "novel framework",
    "novel approach",
    "innovative approach",
    "pioneering approach",
    "cutting-edge",
    "state-of-the-art results",
    "achieves state-of-the-art",
    "surpasses existing methods",
    "outperforms existing",
    "demonstrates superior",
    "exhibits remarkable",
    "showcases the effectiveness",
    "underscores the importance",
    // Empty superlatives
    "remarkable performance",
    "impressive results",
    "significant improvements",
    "substantial improvements",
    "notable improvements",
    "promising results",
    "encouraging results",
    // Vague technical claims
    "seamlessly integrates",
    "effectively captures",
    "efficiently handles",
    "elegantly addresses",
    "robustly handles",
    // Assistant tells
    "as an ai",
    "as a language model",
    "i don't have personal",
    "i cannot provide",
];

// Structural patterns that read as templated claims.
static SLOP_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?:first|second|third|fourth|fifth)(?:ly)?,?\s+we").unwrap(),
        Regex::new(r"to\s+(?:the\s+)?best\s+of\s+our\s+knowledge").unwrap(),
        Regex::new(r"(?:large|extensive|comprehensive)\s+(?:set\s+of\s+)?experiments").unwrap(),
        Regex::new(r"(?:significantly|substantially|considerably)\s+(?:outperforms?|improves?|enhances?)").unwrap(),
        Regex::new(r"a\s+(?:novel|new|innovative)\s+(?:method|approach|framework|technique|paradigm)").unwrap(),
    ]
});

// Signals of concrete, checkable substance. Each reduces the score.
const QUALITY_SIGNALS: &[&str] = &[
    // Specific technical detail
    "ablation study",
    "ablation experiments",
    "statistical significance",
    "p-value",
    "confidence interval",
    "hyperparameter",
    "learning rate",
    "batch size",
    "training steps",
    "compute budget",
    "flops",
    "gpu hours",
    // Reproducibility
    "code available",
    "open source",
    "github",
    "reproducible",
    "implementation details",
    // Honest limitations
    "limitation",
    "limitations",
    "fails to",
    "does not handle",
    "future work",
    "room for improvement",
    // Named benchmarks
    "imagenet",
    "glue",
    "superglue",
    "mmlu",
    "hellaswag",
    "arc challenge",
    "winogrande",
    "gsm8k",
    "math benchmark",
    "humaneval",
    "mbpp",
];

/// Human-readable band for a slop score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SlopAssessment {
    Clean,
    MinorSlop,
    ModerateSlop,
    HeavySlop,
    LikelyGenerated,
}

impl SlopAssessment {
    fn from_score(score: f64) -> Self {
        if score < 0.1 {
            Self::Clean
        } else if score < 0.25 {
            Self::MinorSlop
        } else if score < 0.5 {
            Self::ModerateSlop
        } else if score < 0.75 {
            Self::HeavySlop
        } else {
            Self::LikelyGenerated
        }
    }
}

/// Result of slop analysis over a piece of text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlopReport {
    /// Density score in [0, 1]; higher means more slop.
    pub score: f64,
    /// Band label for the score.
    pub assessment: SlopAssessment,
    /// Up to ten detected phrases, for diagnostics.
    pub detected: Vec<String>,
}

impl SlopReport {
    /// Whether the text is likely generated or low quality.
    pub fn is_likely_slop(&self) -> bool {
        self.score >= 0.5
    }
}

/// Score a text for slop density.
///
/// The base score is slop occurrences per 100 words scaled by 0.15 and
/// capped at 1.0; quality signals subtract 0.05 each (at most 0.3); the
/// result is floored at 0.
pub fn detect_slop(text: &str) -> SlopReport {
    if text.trim().is_empty() {
        return SlopReport {
            score: 0.0,
            assessment: SlopAssessment::Clean,
            detected: Vec::new(),
        };
    }

    let lower = text.to_lowercase();
    let mut detected = Vec::new();
    let mut slop_count = 0usize;

    for phrase in SLOP_PHRASES {
        if lower.contains(phrase) {
            slop_count += 1;
            detected.push((*phrase).to_string());
        }
    }

    for pattern in SLOP_PATTERNS.iter() {
        for m in pattern.find_iter(&lower) {
            slop_count += 1;
            detected.push(m.as_str().to_string());
        }
    }

    let quality_count = QUALITY_SIGNALS
        .iter()
        .filter(|signal| lower.contains(*signal))
        .count();

    let words = text.split_whitespace().count();
    let per_hundred = slop_count as f64 / (words as f64 / 100.0).max(1.0);

    let base_score = (per_hundred * 0.15).min(1.0);
    let quality_reduction = (quality_count as f64 * 0.05).min(0.3);
    let score = (base_score - quality_reduction).max(0.0);

    detected.truncate(10);

    SlopReport {
        score: (score * 1000.0).round() / 1000.0,
        assessment: SlopAssessment::from_score(score),
        detected,
    }
}
