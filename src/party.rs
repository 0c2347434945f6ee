// src/party.rs
//! Party profile registry: keyword tiers per party, the `Global` sentinel, and
//! the permissive fallback for parties nobody has curated yet.
//!
//! - Tiers are case-insensitive substring sets (lower-cased on load).
//! - `primary` and `leaders` must be non-empty for every registered party.
//! - Lookups are case-insensitive on the party id.
//! - Read-only once built; share it behind an `Arc`.

use anyhow::bail;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Sentinel party id meaning "no filtering".
pub const GLOBAL_PARTY: &str = "Global";

/// Keyword tiers for one political entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyProfile {
    pub id: String,
    /// Authoritative names and abbreviations.
    pub primary: Vec<String>,
    /// Titles and common media shorthand.
    #[serde(default)]
    pub secondary: Vec<String>,
    /// Named individuals.
    pub leaders: Vec<String>,
    /// Terms that veto an item outright.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Query string handed to provider adapters.
    #[serde(default)]
    pub search_terms: Option<String>,
}

impl PartyProfile {
    /// Build a profile from string slices. Terms are lower-cased.
    pub fn new(
        id: &str,
        primary: &[&str],
        secondary: &[&str],
        leaders: &[&str],
        exclude: &[&str],
    ) -> Self {
        let own = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let mut p = Self {
            id: id.to_string(),
            primary: own(primary),
            secondary: own(secondary),
            leaders: own(leaders),
            exclude: own(exclude),
            search_terms: None,
        };
        p.canonicalize();
        p
    }

    pub fn with_search_terms(mut self, terms: &str) -> Self {
        self.search_terms = Some(terms.to_string());
        self
    }

    /// Lower-case, trim and drop empty terms in every tier.
    fn canonicalize(&mut self) {
        for tier in [
            &mut self.primary,
            &mut self.secondary,
            &mut self.leaders,
            &mut self.exclude,
        ] {
            let cleaned: Vec<String> = tier
                .iter()
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect();
            *tier = cleaned;
        }
        self.id = self.id.trim().to_string();
    }

    /// `primary + leaders`, the terms handed to prompt builders.
    pub fn anchor_terms(&self) -> Vec<String> {
        self.primary
            .iter()
            .chain(self.leaders.iter())
            .cloned()
            .collect()
    }
}

/// What the scorer should do for a given party selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartyScope<'a> {
    /// No filtering: everything relevant, score 100.
    Global,
    /// A curated profile.
    Profile(&'a PartyProfile),
    /// Not curated yet: everything relevant, score 50.
    Unknown(&'a str),
}

impl<'a> PartyScope<'a> {
    /// Display label used in prompts and logs.
    pub fn label(&self) -> &'a str {
        match self {
            PartyScope::Global => GLOBAL_PARTY,
            PartyScope::Profile(p) => p.id.as_str(),
            PartyScope::Unknown(id) => id,
        }
    }

    pub fn profile(&self) -> Option<&'a PartyProfile> {
        match self {
            PartyScope::Profile(p) => Some(p),
            _ => None,
        }
    }
}

pub fn is_global(party_id: &str) -> bool {
    party_id.trim().eq_ignore_ascii_case(GLOBAL_PARTY)
}

/// Static table of party profiles.
#[derive(Debug, Clone, Default)]
pub struct PartyRegistry {
    parties: BTreeMap<String, PartyProfile>,
}

impl PartyRegistry {
    /// Build from profiles, enforcing the non-empty `primary`/`leaders` invariant.
    pub fn from_profiles(profiles: Vec<PartyProfile>) -> anyhow::Result<Self> {
        let mut parties = BTreeMap::new();
        for mut p in profiles {
            p.canonicalize();
            if p.id.is_empty() {
                bail!("party profile with empty id");
            }
            if is_global(&p.id) {
                bail!("`{GLOBAL_PARTY}` is reserved and cannot carry a profile");
            }
            if p.primary.is_empty() {
                bail!("party `{}` has no primary keywords", p.id);
            }
            if p.leaders.is_empty() {
                bail!("party `{}` has no leader keywords", p.id);
            }
            let key = p.id.to_ascii_uppercase();
            if parties.insert(key, p).is_some() {
                bail!("duplicate party profile id");
            }
        }
        Ok(Self { parties })
    }

    /// Built-in seed: the four Tamil Nadu parties tracked by default.
    pub fn builtin() -> Self {
        let mut parties = BTreeMap::new();
        for p in builtin_profiles() {
            parties.insert(p.id.to_ascii_uppercase(), p);
        }
        Self { parties }
    }

    /// Deterministic, side-effect free lookup. `Global` has no profile.
    pub fn lookup(&self, party_id: &str) -> Option<&PartyProfile> {
        self.parties.get(&party_id.trim().to_ascii_uppercase())
    }

    /// Resolve a selection into a scope. Unknown ids degrade to a permissive
    /// scope and are reported at warn level.
    pub fn resolve<'a>(&'a self, party_id: &'a str) -> PartyScope<'a> {
        if is_global(party_id) {
            return PartyScope::Global;
        }
        match self.lookup(party_id) {
            Some(p) => PartyScope::Profile(p),
            None => {
                warn!(party = %party_id, "no keyword profile for party; treating all items as relevant");
                PartyScope::Unknown(party_id)
            }
        }
    }

    /// Registered ids in stable order.
    pub fn ids(&self) -> Vec<&str> {
        self.parties.values().map(|p| p.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.parties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parties.is_empty()
    }

    /// Query string for provider adapters.
    pub fn search_term(&self, party_id: &str, region: &str) -> String {
        if party_id.trim().is_empty() || is_global(party_id) {
            return format!("{region} Politics");
        }
        match self.lookup(party_id).and_then(|p| p.search_terms.clone()) {
            Some(t) => t,
            None => format!("{} {region}", party_id.trim()),
        }
    }
}

fn builtin_profiles() -> Vec<PartyProfile> {
    vec![
        PartyProfile::new(
            "TVK",
            &["tvk", "vijay", "tamizhaga vettri kazhagam"],
            &["thalapathy", "actor vijay", "vettri kazhagam"],
            &["vijay"],
            &[],
        )
        .with_search_terms("Tamizhaga Vettri Kazhagam Vijay TVK"),
        PartyProfile::new(
            "DMK",
            &["dmk", "dravida munnetra kazhagam", "stalin"],
            &["mk stalin", "chief minister", "cm stalin"],
            &["stalin", "mk stalin", "udhayanidhi"],
            &[],
        )
        .with_search_terms("DMK Stalin Tamil Nadu"),
        PartyProfile::new(
            "ADMK",
            &["admk", "aiadmk", "all india anna dravida munnetra kazhagam"],
            &["palaniswami", "eps", "edappadi", "amma"],
            &["palaniswami", "eps", "edappadi", "jayalalithaa"],
            &[],
        )
        .with_search_terms("AIADMK ADMK Palaniswami EPS"),
        PartyProfile::new(
            "BJP",
            &["bjp", "bharatiya janata party", "annamalai"],
            &["k annamalai", "saffron", "hindutva"],
            &["annamalai", "modi", "narendra modi"],
            &[],
        )
        .with_search_terms("BJP Annamalai Tamil Nadu"),
    ]
}
