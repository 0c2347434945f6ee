//! Data quality checks over normalized batches.

use serde::{Deserialize, Serialize};

use crate::normalize::{NormalizedItem, RawItem};

pub const DEFAULT_ENGLISH_THRESHOLD: f64 = 0.7;
/// Looser ratio applied to titles when validating a batch.
pub const TITLE_ENGLISH_THRESHOLD: f64 = 0.5;
const MAX_ISSUES: usize = 10;

/// Batch-level quality summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityReport {
    pub valid: bool,
    pub valid_count: usize,
    pub total_count: usize,
    pub valid_ratio: f64,
    pub issues: Vec<String>,
}

/// Share of ASCII letters and whitespace among all chars is at least `threshold`.
pub fn is_english(text: &str, threshold: f64) -> bool {
    let total = text.chars().count();
    if total == 0 {
        return false;
    }
    let latin = text
        .chars()
        .filter(|c| c.is_ascii_alphabetic() || c.is_whitespace())
        .count();
    if latin == 0 {
        return false;
    }
    latin as f64 / total as f64 >= threshold
}

/// Validity is judged on the provider record: a description alone is not enough.
pub fn validate_data_quality(items: &[RawItem]) -> QualityReport {
    let mut issues = Vec::new();
    let mut valid_count = 0;

    for (idx, it) in items.iter().enumerate() {
        if it.has_title_or_content() {
            valid_count += 1;
        } else {
            issues.push(format!("Item {idx}: Missing title and content"));
        }
        let title = it.title();
        if !title.is_empty() && !is_english(&title, TITLE_ENGLISH_THRESHOLD) {
            issues.push(format!("Item {idx}: Non-English title detected"));
        }
    }
    issues.truncate(MAX_ISSUES);

    QualityReport {
        valid: valid_count > 0,
        valid_count,
        total_count: items.len(),
        valid_ratio: if items.is_empty() {
            0.0
        } else {
            valid_count as f64 / items.len() as f64
        },
        issues,
    }
}

/// Keep items whose title and body read as English.
pub fn english_only(items: Vec<NormalizedItem>, threshold: f64) -> Vec<NormalizedItem> {
    items
        .into_iter()
        .filter(|it| is_english(&format!("{} {}", it.title, it.body), threshold))
        .collect()
}
