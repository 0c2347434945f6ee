// src/relevance.rs
//! Relevance scorer: tier weights, regional qualifier, exclusion veto, and the
//! primary-or-leader keyword gate.
//!
//! Scoring is additive and clamped to ⟨0..100⟩:
//! exclusion veto first (0), then +primary per primary hit, +leader per leader
//! hit, +secondary per secondary hit, and a single regional bonus.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::normalize::NormalizedItem;
use crate::party::{PartyProfile, PartyScope};

/// Score for the `Global` sentinel.
pub const GLOBAL_SCORE: u8 = 100;
/// Score for parties without a curated profile.
pub const UNKNOWN_PARTY_SCORE: u8 = 50;

// Dev logging gate: RELEVANCE_DEV_LOG=1 AND dev env (debug or SHUTTLE_ENV in {local,development,dev})
pub(crate) fn dev_logging_enabled() -> bool {
    let on = std::env::var("RELEVANCE_DEV_LOG").ok().as_deref() == Some("1");
    if !on {
        return false;
    }
    if cfg!(debug_assertions) {
        return true;
    }
    matches!(
        std::env::var("SHUTTLE_ENV")
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str(),
        "local" | "development" | "dev"
    )
}

/// Short, stable, non-reversible id for a text (12 hex chars of SHA-256).
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Minimal, anonymized dev logger for relevance events.
fn dev_log_relevance(event: &str, party: &str, text: &str, rel: &Relevance) {
    if !dev_logging_enabled() {
        return;
    }
    let id = anon_hash(text);
    let matched_short = truncate_vec(&rel.matched, 5);
    let reasons_short = truncate_vec(&rel.reasons, 5);
    // Never log raw text. Only hashed id + short lists.
    info!(
        target: "relevance",
        %id, score = rel.score, %party, event,
        matched = ?matched_short,
        reasons = ?reasons_short
    );
}

pub(crate) fn truncate_vec<T: ToString>(v: &[T], max: usize) -> Vec<String> {
    v.iter().take(max).map(|x| x.to_string()).collect()
}

/* ----------------------------
Config schema (from TOML)
---------------------------- */

/// Per-tier additive weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringWeights {
    #[serde(default = "default_primary")]
    pub primary: u32,
    #[serde(default = "default_leader")]
    pub leader: u32,
    #[serde(default = "default_secondary")]
    pub secondary: u32,
    #[serde(default = "default_regional")]
    pub regional: u32,
}

fn default_primary() -> u32 {
    50
}
fn default_leader() -> u32 {
    40
}
fn default_secondary() -> u32 {
    20
}
fn default_regional() -> u32 {
    10
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            primary: default_primary(),
            leader: default_leader(),
            secondary: default_secondary(),
            regional: default_regional(),
        }
    }
}

/// The administrative region every tracked party operates in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionConfig {
    #[serde(default = "default_region_name")]
    pub name: String,
    /// Qualifier terms that earn the regional bonus.
    #[serde(default = "default_region_terms")]
    pub terms: Vec<String>,
}

fn default_region_name() -> String {
    "Tamil Nadu".to_string()
}
fn default_region_terms() -> Vec<String> {
    vec!["tamil nadu".to_string(), "chennai".to_string()]
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            name: default_region_name(),
            terms: default_region_terms(),
        }
    }
}

/// Result of relevance evaluation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Relevance {
    pub score: u8,
    /// An `exclude` term vetoed the item.
    pub excluded: bool,
    pub matched: Vec<String>,
    pub reasons: Vec<String>,
}

/* ----------------------------
Scorer
---------------------------- */

/// Stateless scorer configured with weights and regional terms.
#[derive(Debug, Clone, Default)]
pub struct RelevanceScorer {
    weights: ScoringWeights,
    region_terms: Vec<String>,
}

impl RelevanceScorer {
    pub fn new(weights: ScoringWeights, region: &RegionConfig) -> Self {
        let region_terms = region
            .terms
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        Self {
            weights,
            region_terms,
        }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Score one item for the given scope, in ⟨0..100⟩.
    pub fn score(&self, item: &NormalizedItem, scope: PartyScope<'_>) -> u8 {
        self.evaluate(item, scope).score
    }

    /// Score plus the matched terms and reasons behind it.
    pub fn evaluate(&self, item: &NormalizedItem, scope: PartyScope<'_>) -> Relevance {
        match scope {
            PartyScope::Global => Relevance {
                score: GLOBAL_SCORE,
                matched: Vec::new(),
                reasons: vec!["global".into()],
                ..Relevance::default()
            },
            PartyScope::Unknown(_) => Relevance {
                score: UNKNOWN_PARTY_SCORE,
                matched: Vec::new(),
                reasons: vec!["unknown_party_permissive".into()],
                ..Relevance::default()
            },
            PartyScope::Profile(profile) => {
                let text = item.full_text().to_lowercase();
                let rel = self.evaluate_text(&text, profile);
                let event = if rel.excluded { "excluded" } else { "scored" };
                dev_log_relevance(event, &profile.id, &text, &rel);
                rel
            }
        }
    }

    /// Core scoring over already lower-cased text.
    fn evaluate_text(&self, text: &str, profile: &PartyProfile) -> Relevance {
        let mut rel = Relevance::default();

        // 1) Exclusion veto
        if let Some(term) = profile.exclude.iter().find(|t| text.contains(t.as_str())) {
            rel.excluded = true;
            rel.reasons.push(format!("exclude:{term}"));
            return rel;
        }

        // 2) Additive tiers
        let mut total: u32 = 0;
        for (tier, terms, weight) in [
            ("primary", &profile.primary, self.weights.primary),
            ("leader", &profile.leaders, self.weights.leader),
            ("secondary", &profile.secondary, self.weights.secondary),
        ] {
            for term in terms.iter().filter(|t| text.contains(t.as_str())) {
                total = total.saturating_add(weight);
                rel.matched.push(format!("{tier}:{term}"));
            }
        }

        // 3) Regional qualifier (once)
        if self.region_terms.iter().any(|t| text.contains(t.as_str())) {
            total = total.saturating_add(self.weights.regional);
            rel.reasons.push("regional_bonus".into());
        }

        if total > 100 {
            rel.reasons.push(format!("clamped_from:{total}"));
        }
        rel.score = total.min(100) as u8;
        rel
    }

    /// Keyword gate: at least one primary or leader term in the text.
    pub fn passes_gate(&self, item: &NormalizedItem, profile: &PartyProfile) -> bool {
        let text = item.full_text().to_lowercase();
        profile
            .primary
            .iter()
            .chain(profile.leaders.iter())
            .any(|t| text.contains(t.as_str()))
    }
}

/* ----------------------------
Tests
---------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::SourceType;
    use crate::party::PartyRegistry;

    fn scorer() -> RelevanceScorer {
        RelevanceScorer::new(ScoringWeights::default(), &RegionConfig::default())
    }

    fn item(title: &str) -> NormalizedItem {
        NormalizedItem::new(SourceType::News, title, "")
    }

    fn dmk() -> PartyProfile {
        PartyProfile::new("DMK", &["dmk", "stalin"], &["chief minister"], &["udhayanidhi"], &[])
    }

    #[test]
    fn global_and_unknown_bypass_scoring() {
        let s = scorer();
        let it = item("nothing to see");
        assert_eq!(s.score(&it, PartyScope::Global), 100);
        assert_eq!(s.score(&it, PartyScope::Unknown("PMK")), 50);
    }

    #[test]
    fn two_primary_hits_reach_full_confidence_without_clamp() {
        let s = scorer();
        let p = dmk();
        let r = s.evaluate(&item("DMK leader Stalin announces new policy"), PartyScope::Profile(&p));
        assert_eq!(r.score, 100);
        assert!(r.matched.contains(&"primary:dmk".to_string()));
        assert!(r.matched.contains(&"primary:stalin".to_string()));
        assert!(!r.reasons.iter().any(|x| x.starts_with("clamped_from")));
    }

    #[test]
    fn totals_above_hundred_are_clamped() {
        let s = scorer();
        let p = dmk();
        let r = s.evaluate(
            &item("DMK and Stalin rally in Chennai with Udhayanidhi"),
            PartyScope::Profile(&p),
        );
        assert_eq!(r.score, 100);
        assert!(r.reasons.iter().any(|x| x.starts_with("clamped_from")));
    }

    #[test]
    fn global_and_unknown_scopes_are_never_excluded() {
        let s = scorer();
        let it = item("nothing to see");
        assert!(!s.evaluate(&it, PartyScope::Global).excluded);
        assert!(!s.evaluate(&it, PartyScope::Unknown("PMK")).excluded);
    }

    #[test]
    fn single_primary_is_not_certainty() {
        let s = scorer();
        let p = dmk();
        assert_eq!(s.score(&item("DMK meets today"), PartyScope::Profile(&p)), 50);
        // primary + leader → 90
        assert_eq!(
            s.score(&item("DMK youth wing led by Udhayanidhi"), PartyScope::Profile(&p)),
            90
        );
    }

    #[test]
    fn secondary_and_regional_add_up() {
        let s = scorer();
        let p = dmk();
        let r = s.evaluate(
            &item("Chief Minister visits Chennai with DMK cadres"),
            PartyScope::Profile(&p),
        );
        assert_eq!(r.score, 50 + 20 + 10);
        assert!(r.reasons.contains(&"regional_bonus".to_string()));
    }

    #[test]
    fn regional_bonus_counts_once() {
        let s = scorer();
        let p = dmk();
        assert_eq!(
            s.score(&item("DMK in Chennai, Tamil Nadu"), PartyScope::Profile(&p)),
            60
        );
    }

    #[test]
    fn exclusion_is_an_absolute_veto() {
        let s = scorer();
        let p = PartyProfile::new("BJP", &["bjp"], &[], &["modi"], &["modi biopic"]);
        let r = s.evaluate(
            &item("BJP and Modi react to Modi biopic release"),
            PartyScope::Profile(&p),
        );
        assert_eq!(r.score, 0);
        assert!(r.excluded);
        assert!(r.matched.is_empty());
        assert_eq!(r.reasons, vec!["exclude:modi biopic".to_string()]);
    }

    #[test]
    fn gate_needs_primary_or_leader() {
        let s = scorer();
        let reg = PartyRegistry::builtin();
        let bjp = reg.lookup("BJP").unwrap();
        assert!(!s.passes_gate(&item("Saffron wave in Chennai"), bjp));
        assert!(s.passes_gate(&item("Modi visits Chennai"), bjp));
        assert!(s.passes_gate(&item("Annamalai speaks"), bjp));
    }

    #[test]
    fn matching_is_case_insensitive_substring() {
        let s = scorer();
        let p = dmk();
        assert_eq!(s.score(&item("pro-DMK rally"), PartyScope::Profile(&p)), 50);
    }

    #[test]
    fn anon_hash_is_stable_and_short() {
        assert_eq!(anon_hash("abc"), anon_hash("abc"));
        assert_eq!(anon_hash("abc").len(), 12);
        assert_ne!(anon_hash("abc"), anon_hash("abd"));
    }
}
