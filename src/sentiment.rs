//! Lexical sentiment indicators: counts positive/negative stems in a text.
//!
//! A cheap local cross-check only. It is reported next to (never merged into)
//! the LLM-based assessment.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const POSITIVE_STEMS: &[&str] = &[
    "success",
    "win",
    "victory",
    "growth",
    "improve",
    "better",
    "good",
    "excellent",
    "achievement",
    "progress",
    "support",
    "praise",
    "welcome",
];

pub const NEGATIVE_STEMS: &[&str] = &[
    "fail",
    "loss",
    "defeat",
    "decline",
    "worse",
    "bad",
    "poor",
    "crisis",
    "scandal",
    "corruption",
    "protest",
    "oppose",
    "criticize",
    "condemn",
    "attack",
    "controversy",
];

/// Whole word starting with one of the stems: "fail" matches "failed", "failure".
fn stem_regex(stems: &[&str]) -> Regex {
    let alt = stems
        .iter()
        .map(|s| regex::escape(s))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{alt})\w*\b")).expect("stem regex")
}

static POSITIVE_RE: Lazy<Regex> = Lazy::new(|| stem_regex(POSITIVE_STEMS));
static NEGATIVE_RE: Lazy<Regex> = Lazy::new(|| stem_regex(NEGATIVE_STEMS));

/// Polarity counts for one text (or a sum over many).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentIndicators {
    pub positive: u32,
    pub negative: u32,
    /// 1 when neither list matched, else 0. Summed across items by the aggregator.
    pub neutral: u32,
    /// (positive - negative) / (positive + negative); 0 when both are 0.
    pub score: f64,
}

/// Normalized polarity; defined as 0 when nothing matched.
pub fn polarity(positive: u32, negative: u32) -> f64 {
    let total = positive + negative;
    if total == 0 {
        return 0.0;
    }
    (f64::from(positive) - f64::from(negative)) / f64::from(total)
}

/// Count polarity stems in `text`.
pub fn extract(text: &str) -> SentimentIndicators {
    let positive = POSITIVE_RE.find_iter(text).count() as u32;
    let negative = NEGATIVE_RE.find_iter(text).count() as u32;
    SentimentIndicators {
        positive,
        negative,
        neutral: u32::from(positive == 0 && negative == 0),
        score: polarity(positive, negative),
    }
}
