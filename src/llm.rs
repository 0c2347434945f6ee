//! LLM client: an opaque text oracle behind `generate(prompt, system)`.
//!
//! Production talks to an Ollama server through its OpenAI-compatible
//! `/v1/chat/completions` endpoint. Tests use `MockClient` (or `LLM_TEST_MODE=mock`).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::llm::LlmConfig;

pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://127.0.0.1:11434";
pub const DEFAULT_LLM_MODEL: &str = "deepseek-v3.1:671b-cloud";
pub const ENV_OLLAMA_BASE_URL: &str = "OLLAMA_BASE_URL";
pub const ENV_LLM_MODEL: &str = "POLITICVIEW_LLM_MODEL";
pub const ENV_LLM_TEST_MODE: &str = "LLM_TEST_MODE";

const ERROR_BODY_MAX: usize = 500;

/// Why a generation produced no text.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM is disabled")]
    Disabled,
    #[error("LLM request failed: {0}")]
    Transport(String),
    #[error("LLM returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("LLM response could not be decoded: {0}")]
    Decode(String),
}

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait object used by the advisory layer and HTTP handlers.
pub trait LlmClient: Send + Sync {
    /// Send `prompt` (optionally preceded by a system message), return the reply text.
    fn generate<'a>(
        &'a self,
        prompt: &'a str,
        system: Option<&'a str>,
    ) -> BoxFuture<'a, Result<String, LlmError>>;
    /// Provider name for diagnostics and responses.
    fn provider_name(&self) -> &'static str;
}

pub type DynLlmClient = Arc<dyn LlmClient>;

/// Factory.
///
/// * `LLM_TEST_MODE=mock` → deterministic mock client.
/// * `enabled == false` or unknown provider → disabled client.
/// * `provider == "ollama"` → HTTP client; `model`/`base_url` from config, then env, then defaults.
pub fn build_client_from_config(config: &LlmConfig) -> DynLlmClient {
    if std::env::var(ENV_LLM_TEST_MODE)
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Arc::new(MockClient::new("Neutral assessment (mock)"));
    }

    if !config.enabled {
        return Arc::new(DisabledClient);
    }

    match config.provider.as_str() {
        "ollama" => {
            let base_url = config
                .base_url
                .clone()
                .or_else(|| std::env::var(ENV_OLLAMA_BASE_URL).ok())
                .unwrap_or_else(|| DEFAULT_OLLAMA_BASE_URL.to_string());
            let model = config
                .model
                .clone()
                .or_else(|| std::env::var(ENV_LLM_MODEL).ok())
                .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string());
            match OllamaClient::new(&base_url, &model) {
                Ok(c) => Arc::new(c),
                Err(e) => {
                    warn!(error = %e, "could not build LLM HTTP client; LLM disabled");
                    Arc::new(DisabledClient)
                }
            }
        }
        other => {
            warn!(provider = %other, "unsupported LLM provider; LLM disabled");
            Arc::new(DisabledClient)
        }
    }
}

/* ----------------------------
Ollama (OpenAI-compatible chat completions)
---------------------------- */

pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .user_agent("politicview/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| LlmError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, prompt: &str, system: Option<&str>) -> Result<String, LlmError> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            stream: bool,
        }
        #[derive(Deserialize)]
        struct Resp {
            #[serde(default)]
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            #[serde(default)]
            content: Option<String>,
        }

        let mut messages = Vec::with_capacity(2);
        if let Some(sys) = system {
            messages.push(Msg {
                role: "system",
                content: sys,
            });
        }
        messages.push(Msg {
            role: "user",
            content: prompt,
        });
        let req = Req {
            model: &self.model,
            messages,
            stream: false,
        };

        let url = format!("{}/v1/chat/completions", self.base_url);
        debug!(target: "llm", %url, model = %self.model, prompt_len = prompt.len(), "chat request");
        let resp = self
            .http
            .post(&url)
            .json(&req)
            .send()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body: text.chars().take(ERROR_BODY_MAX).collect(),
            });
        }

        let body: Resp = resp
            .json()
            .await
            .map_err(|e| LlmError::Decode(e.to_string()))?;
        Ok(body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}

impl LlmClient for OllamaClient {
    fn generate<'a>(
        &'a self,
        prompt: &'a str,
        system: Option<&'a str>,
    ) -> BoxFuture<'a, Result<String, LlmError>> {
        Box::pin(self.chat(prompt, system))
    }
    fn provider_name(&self) -> &'static str {
        "ollama"
    }
}

/* ----------------------------
Disabled / mock
---------------------------- */

/// Always fails with `LlmError::Disabled`.
pub struct DisabledClient;

impl LlmClient for DisabledClient {
    fn generate<'a>(
        &'a self,
        _prompt: &'a str,
        _system: Option<&'a str>,
    ) -> BoxFuture<'a, Result<String, LlmError>> {
        Box::pin(async { Err(LlmError::Disabled) })
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Returns a fixed reply.
#[derive(Debug, Clone)]
pub struct MockClient {
    pub fixed: String,
}

impl MockClient {
    pub fn new(fixed: impl Into<String>) -> Self {
        Self {
            fixed: fixed.into(),
        }
    }
}

impl LlmClient for MockClient {
    fn generate<'a>(
        &'a self,
        _prompt: &'a str,
        _system: Option<&'a str>,
    ) -> BoxFuture<'a, Result<String, LlmError>> {
        let out = self.fixed.clone();
        Box::pin(async move { Ok(out) })
    }
    fn provider_name(&self) -> &'static str {
        "mock"
    }
}
