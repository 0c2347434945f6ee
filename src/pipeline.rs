// src/pipeline.rs
//! Filter/rank pipeline: keyword gate → score → threshold → sort.
//!
//! One implementation serves both the strict single-source call sites and the
//! lenient cross-source aggregator; callers pick a `Strictness`.

use metrics::counter;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::normalize::NormalizedItem;
use crate::party::PartyScope;
use crate::relevance::{RelevanceScorer, GLOBAL_SCORE};

/// Standalone default threshold.
pub const DEFAULT_STRICT_MIN_SCORE: i32 = 40;
/// Aggregator default threshold.
pub const DEFAULT_LENIENT_MIN_SCORE: i32 = 30;

/// Which threshold profile a call site wants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    #[default]
    Strict,
    Lenient,
}

/// Threshold per strictness level. Values are not validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    #[serde(default = "default_strict")]
    pub strict: i32,
    #[serde(default = "default_lenient")]
    pub lenient: i32,
}

fn default_strict() -> i32 {
    DEFAULT_STRICT_MIN_SCORE
}
fn default_lenient() -> i32 {
    DEFAULT_LENIENT_MIN_SCORE
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            strict: DEFAULT_STRICT_MIN_SCORE,
            lenient: DEFAULT_LENIENT_MIN_SCORE,
        }
    }
}

impl Thresholds {
    pub fn min_score(&self, strictness: Strictness) -> i32 {
        match strictness {
            Strictness::Strict => self.strict,
            Strictness::Lenient => self.lenient,
        }
    }
}

/// A normalized item with its relevance score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredItem {
    #[serde(flatten)]
    pub item: NormalizedItem,
    pub relevance_score: u8,
}

/// Outcome counters for one `rank` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RankStats {
    pub input: usize,
    pub gate_rejected: usize,
    /// Vetoed by an `exclude` term; dropped whatever the threshold.
    pub excluded: usize,
    pub below_threshold: usize,
    pub kept: usize,
}

impl RankStats {
    /// Add this call's counts to the pipeline counters.
    pub fn record(&self) {
        counter!("pipeline_items_total").increment(self.input as u64);
        counter!("pipeline_items_kept_total").increment(self.kept as u64);
        counter!("pipeline_gate_rejected_total").increment(self.gate_rejected as u64);
    }
}

/// Rank `items` for `scope`, dropping anything scoring below `min_score`.
///
/// `Global` returns every item scored 100 in input order. `min_score` above 100
/// yields an empty result; it is never treated as an error.
pub fn rank(
    scorer: &RelevanceScorer,
    items: &[NormalizedItem],
    scope: PartyScope<'_>,
    min_score: i32,
) -> Vec<ScoredItem> {
    rank_with_stats(scorer, items, scope, min_score).0
}

/// `rank` plus the counters the aggregator and metrics report on.
pub fn rank_with_stats(
    scorer: &RelevanceScorer,
    items: &[NormalizedItem],
    scope: PartyScope<'_>,
    min_score: i32,
) -> (Vec<ScoredItem>, RankStats) {
    let mut stats = RankStats {
        input: items.len(),
        ..RankStats::default()
    };

    // (1) Global bypass: unfiltered, original order
    if let PartyScope::Global = scope {
        let out: Vec<ScoredItem> = items
            .iter()
            .map(|it| ScoredItem {
                item: it.clone(),
                relevance_score: GLOBAL_SCORE,
            })
            .collect();
        stats.kept = out.len();
        return (out, stats);
    }

    let mut ranked = Vec::with_capacity(items.len());
    for it in items {
        // (2) Keyword gate
        if let Some(profile) = scope.profile() {
            if !scorer.passes_gate(it, profile) {
                stats.gate_rejected += 1;
                continue;
            }
        }

        // (3) Score; exclusion vetoes are dropped outright
        let rel = scorer.evaluate(it, scope);
        if rel.excluded {
            stats.excluded += 1;
            continue;
        }
        let score = rel.score;

        // (4) Threshold
        if i32::from(score) < min_score {
            stats.below_threshold += 1;
            continue;
        }
        ranked.push(ScoredItem {
            item: it.clone(),
            relevance_score: score,
        });
    }

    // (5) Stable sort: score desc, then most recent first, undated last
    ranked.sort_by(compare_ranked);
    stats.kept = ranked.len();
    (ranked, stats)
}

fn compare_ranked(a: &ScoredItem, b: &ScoredItem) -> Ordering {
    b.relevance_score
        .cmp(&a.relevance_score)
        .then_with(|| match (a.item.published_at, b.item.published_at) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}
