// src/config/llm.rs
use serde::{Deserialize, Serialize};
use std::{fs, io::ErrorKind, path::Path, path::PathBuf};
use tracing::warn;

pub const DEFAULT_LLM_CONFIG_PATH: &str = "config/llm.json";
pub const ENV_LLM_CONFIG_PATH: &str = "LLM_CONFIG_PATH";

fn default_provider() -> String {
    "ollama".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmConfig {
    pub enabled: bool,
    /// "ollama" (case-insensitive); anything else builds a disabled client.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Overrides `POLITICVIEW_LLM_MODEL` and the built-in default.
    #[serde(default)]
    pub model: Option<String>,
    /// Overrides `OLLAMA_BASE_URL` and the built-in default.
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_provider(),
            model: None,
            base_url: None,
        }
    }
}

impl LlmConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)?;
        let mut cfg: LlmConfig = serde_json::from_str(&data)?;

        cfg.provider = cfg.provider.trim().to_lowercase();
        // Blank overrides mean "not set"
        cfg.model = cfg.model.filter(|m| !m.trim().is_empty());
        cfg.base_url = cfg
            .base_url
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty());

        Ok(cfg)
    }

    /// `LLM_CONFIG_PATH` or `config/llm.json`. Missing file → disabled; malformed → error.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var(ENV_LLM_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_LLM_CONFIG_PATH));
        match Self::load_from_file(&path) {
            Ok(cfg) => Ok(cfg),
            Err(e)
                if e.downcast_ref::<std::io::Error>()
                    .is_some_and(|io| io.kind() == ErrorKind::NotFound) =>
            {
                warn!(path = %path.display(), "llm config not found; LLM disabled");
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Invalid llm config at {}: {}",
                path.display(),
                e
            )),
        }
    }
}
