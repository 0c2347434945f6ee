// src/config/mod.rs
//! Pipeline settings: scoring weights, region, thresholds, keyword table size
//! and the party registry, loaded from `config/pipeline.toml`.

pub mod llm;

use serde::Deserialize;
use std::{fs, io::ErrorKind, path::Path, path::PathBuf};
use tracing::{info, warn};

use crate::aggregate::DEFAULT_TOP_KEYWORDS;
use crate::party::{PartyProfile, PartyRegistry};
use crate::pipeline::Thresholds;
use crate::relevance::{RegionConfig, RelevanceScorer, ScoringWeights};

pub const DEFAULT_PIPELINE_CONFIG_PATH: &str = "config/pipeline.toml";
pub const ENV_PIPELINE_CONFIG_PATH: &str = "PIPELINE_CONFIG_PATH";
pub const ENV_MIN_SCORE_STRICT: &str = "RANK_MIN_SCORE_STRICT";
pub const ENV_MIN_SCORE_LENIENT: &str = "RANK_MIN_SCORE_LENIENT";

/* ----------------------------
TOML schema
---------------------------- */

#[derive(Debug, Clone, Default, Deserialize)]
struct PipelineRoot {
    #[serde(default)]
    scoring: ScoringWeights,
    #[serde(default)]
    region: RegionConfig,
    #[serde(default)]
    thresholds: Thresholds,
    #[serde(default)]
    aggregation: AggregationSection,
    /// Empty means "use the built-in registry".
    #[serde(default)]
    parties: Vec<PartyProfile>,
}

#[derive(Debug, Clone, Deserialize)]
struct AggregationSection {
    #[serde(default = "default_top_keywords")]
    top_keywords: usize,
}

fn default_top_keywords() -> usize {
    DEFAULT_TOP_KEYWORDS
}

impl Default for AggregationSection {
    fn default() -> Self {
        Self {
            top_keywords: DEFAULT_TOP_KEYWORDS,
        }
    }
}

/* ----------------------------
Settings
---------------------------- */

/// Everything the core needs, injected by the caller.
#[derive(Debug, Clone)]
pub struct Settings {
    pub registry: PartyRegistry,
    pub weights: ScoringWeights,
    pub region: RegionConfig,
    pub thresholds: Thresholds,
    pub top_keywords: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            registry: PartyRegistry::builtin(),
            weights: ScoringWeights::default(),
            region: RegionConfig::default(),
            thresholds: Thresholds::default(),
            top_keywords: DEFAULT_TOP_KEYWORDS,
        }
    }
}

impl Settings {
    /// Load from `PIPELINE_CONFIG_PATH` or `config/pipeline.toml`, then apply env overrides.
    /// A missing file falls back to built-in defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var(ENV_PIPELINE_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_PIPELINE_CONFIG_PATH));

        let mut settings = Self::from_path(&path)?;
        settings.apply_env_overrides();
        info!(
            parties = settings.registry.len(),
            strict = settings.thresholds.strict,
            lenient = settings.thresholds.lenient,
            "pipeline settings ready"
        );
        Ok(settings)
    }

    /// Read a TOML file. Missing → defaults with a warning; unreadable or malformed → error.
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content).map_err(|e| {
                anyhow::anyhow!("Invalid pipeline config at {}: {}", path.display(), e)
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(path = %path.display(), "pipeline config not found; using built-in defaults");
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Failed to read pipeline config at {}: {}",
                path.display(),
                e
            )),
        }
    }

    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        let root: PipelineRoot = toml::from_str(toml_str)?;
        let registry = if root.parties.is_empty() {
            PartyRegistry::builtin()
        } else {
            PartyRegistry::from_profiles(root.parties)?
        };
        Ok(Self {
            registry,
            weights: root.scoring,
            region: root.region,
            thresholds: root.thresholds,
            top_keywords: root.aggregation.top_keywords,
        })
    }

    /// `RANK_MIN_SCORE_STRICT` / `RANK_MIN_SCORE_LENIENT`; unparsable values are ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Some(v) = parse_min_score_env(std::env::var(ENV_MIN_SCORE_STRICT).ok()) {
            self.thresholds.strict = v;
        }
        if let Some(v) = parse_min_score_env(std::env::var(ENV_MIN_SCORE_LENIENT).ok()) {
            self.thresholds.lenient = v;
        }
    }

    pub fn scorer(&self) -> RelevanceScorer {
        RelevanceScorer::new(self.weights, &self.region)
    }
}

fn parse_min_score_env(raw: Option<String>) -> Option<i32> {
    raw.and_then(|s| s.trim().parse::<i32>().ok())
}
