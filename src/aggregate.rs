// src/aggregate.rs
//! Feed aggregator: runs the rank pipeline per provider and merges the results
//! into one report (source breakdown, lexical sentiment totals, top keywords).

use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

use crate::normalize::{NormalizedItem, SourceType};
use crate::party::PartyScope;
use crate::pipeline::{rank_with_stats, ScoredItem};
use crate::relevance::RelevanceScorer;
use crate::sentiment::{self, polarity};

/// Default size of the keyword table.
pub const DEFAULT_TOP_KEYWORDS: usize = 10;

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
        "from", "as", "is", "was", "are", "were", "been", "be", "have", "has", "had", "do",
        "does", "did", "will", "would", "could", "should", "may", "might", "must", "can", "this",
        "that", "these", "those",
    ]
    .into_iter()
    .collect()
});

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").expect("non-word regex"));

/// Per-provider slice of the report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceBreakdown {
    pub total: usize,
    pub filtered: usize,
    pub items: Vec<ScoredItem>,
}

/// Summed lexical indicators across filtered items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentTotals {
    pub positive: u32,
    pub negative: u32,
    pub neutral: u32,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordCount {
    pub word: String,
    pub count: usize,
}

/// Terminal output of one aggregation call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationReport {
    pub total_items: usize,
    pub filtered_items: usize,
    pub by_source: BTreeMap<SourceType, SourceBreakdown>,
    pub sentiment: SentimentTotals,
    pub top_keywords: Vec<KeywordCount>,
}

/// Cross-source aggregator. Holds only read-only configuration.
#[derive(Debug, Clone)]
pub struct FeedAggregator<'a> {
    scorer: &'a RelevanceScorer,
    top_k: usize,
}

impl<'a> FeedAggregator<'a> {
    pub fn new(scorer: &'a RelevanceScorer) -> Self {
        Self {
            scorer,
            top_k: DEFAULT_TOP_KEYWORDS,
        }
    }

    pub fn with_top_keywords(mut self, k: usize) -> Self {
        self.top_k = k;
        self
    }

    /// Rank each provider's items independently and merge the statistics.
    /// An empty provider list contributes zero counts, never an error.
    pub fn aggregate(
        &self,
        feeds: &BTreeMap<SourceType, Vec<NormalizedItem>>,
        scope: PartyScope<'_>,
        min_score: i32,
    ) -> AggregationReport {
        let mut report = AggregationReport::default();
        let mut keywords = KeywordCounter::default();

        for (source, items) in feeds {
            let (filtered, stats) = rank_with_stats(self.scorer, items, scope, min_score);

            stats.record();
            debug!(
                target: "aggregate",
                source = %source,
                total = stats.input,
                gate_rejected = stats.gate_rejected,
                below_threshold = stats.below_threshold,
                kept = stats.kept,
                "source ranked"
            );

            for scored in &filtered {
                let text = scored.item.full_text();
                let ind = sentiment::extract(&text);
                report.sentiment.positive += ind.positive;
                report.sentiment.negative += ind.negative;
                report.sentiment.neutral += ind.neutral;
                keywords.feed(&text);
            }

            report.total_items += items.len();
            report.filtered_items += filtered.len();
            report.by_source.insert(
                *source,
                SourceBreakdown {
                    total: items.len(),
                    filtered: filtered.len(),
                    items: filtered,
                },
            );
        }

        report.sentiment.score = polarity(report.sentiment.positive, report.sentiment.negative);
        report.top_keywords = keywords.top(self.top_k);
        counter!("aggregate_runs_total").increment(1);
        report
    }
}

/// Keyword frequencies with first-seen order for tie-breaking.
#[derive(Debug, Default)]
struct KeywordCounter {
    counts: HashMap<String, (usize, usize)>,
    next_seen: usize,
}

impl KeywordCounter {
    fn feed(&mut self, text: &str) {
        for word in tokenize_keywords(text) {
            let seen = self.next_seen;
            let entry = self.counts.entry(word).or_insert_with(|| (0, seen));
            if entry.1 == seen {
                self.next_seen += 1;
            }
            entry.0 += 1;
        }
    }

    fn top(self, k: usize) -> Vec<KeywordCount> {
        let mut rows: Vec<(String, usize, usize)> = self
            .counts
            .into_iter()
            .map(|(w, (count, first))| (w, count, first))
            .collect();
        rows.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
        rows.into_iter()
            .take(k)
            .map(|(word, count, _)| KeywordCount { word, count })
            .collect()
    }
}

/// Lower-case, drop punctuation, keep tokens longer than 3 chars that are not stop words.
pub fn tokenize_keywords(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    NON_WORD
        .replace_all(&lower, " ")
        .split_whitespace()
        .filter(|w| w.chars().count() > 3 && !STOP_WORDS.contains(w))
        .map(str::to_string)
        .collect()
}

/// Keyword table for an arbitrary text.
pub fn extract_key_topics(text: &str, limit: usize) -> Vec<KeywordCount> {
    let mut kc = KeywordCounter::default();
    kc.feed(text);
    kc.top(limit)
}
