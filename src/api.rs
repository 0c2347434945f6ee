// src/api.rs
//! HTTP surface: rank, aggregate, quality and the LLM-backed advisory routes.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tower_http::cors::CorsLayer;
use tracing::warn;

use crate::advisory::{
    self, BotReport, DataValidation, PartySentiment, PrReport, SentimentAssessment,
};
use crate::aggregate::{AggregationReport, FeedAggregator};
use crate::config::llm::LlmConfig;
use crate::config::Settings;
use crate::error::CoreError;
use crate::llm::{build_client_from_config, DynLlmClient, LlmError};
use crate::normalize::{normalize_batch, raw_batch, NormalizedItem, SourceType};
use crate::party::{is_global, PartyScope};
use crate::pipeline::{rank_with_stats, ScoredItem, Strictness};
use crate::quality::{validate_data_quality, QualityReport};
use crate::relevance::RelevanceScorer;

/// Shared, read-only state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub scorer: Arc<RelevanceScorer>,
    pub llm: DynLlmClient,
}

impl AppState {
    pub fn new(settings: Settings, llm: DynLlmClient) -> Self {
        let scorer = settings.scorer();
        Self {
            settings: Arc::new(settings),
            scorer: Arc::new(scorer),
            llm,
        }
    }

    /// Pipeline settings and LLM client from the default config locations.
    pub fn from_env() -> anyhow::Result<Self> {
        let settings = Settings::load()?;
        let llm_cfg = LlmConfig::load()?;
        Ok(Self::new(settings, build_client_from_config(&llm_cfg)))
    }

    fn region(&self) -> &str {
        &self.settings.region.name
    }

    fn party_ids(&self) -> Vec<&str> {
        self.settings.registry.ids()
    }

    /// "DMK" for a party, "Tamil Nadu politics" for Global or no party.
    fn subject(&self, party: Option<&str>) -> String {
        match party.map(str::trim).filter(|p| !p.is_empty() && !is_global(p)) {
            Some(p) => p.to_string(),
            None => format!("{} politics", self.region()),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/parties", get(parties))
        .route("/api/rank", post(rank_items))
        .route("/api/aggregate", post(aggregate_feeds))
        .route("/api/quality", post(quality))
        .route("/api/analyze/sentiment", post(analyze_sentiment))
        .route("/api/analyze/heatmap", post(analyze_heatmap))
        .route("/api/analyze/bot-detection", post(bot_detection))
        .route("/api/analyze/pr-detection", post(pr_detection))
        .route("/api/analyze/validate", post(validate_data))
        .route("/api/llm/generate", post(llm_generate))
        .route("/api/llm/strategist", post(llm_strategist))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/* ----------------------------
Errors
---------------------------- */

#[derive(Debug)]
pub enum ApiError {
    /// 400 with `{error: "invalid argument", message}`.
    InvalidArgument(String),
    /// 502 when the LLM oracle fails.
    Upstream { provider: &'static str, message: String },
}

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidArgument(msg) => ApiError::InvalidArgument(msg),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::InvalidArgument(e.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::InvalidArgument(message) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "invalid argument", "message": message })),
            )
                .into_response(),
            ApiError::Upstream { provider, message } => (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": "llm call failed", "provider": provider, "message": message })),
            )
                .into_response(),
        }
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/* ----------------------------
Handlers
---------------------------- */

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "app": "PoliticView" }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PartySummary {
    id: String,
    search_terms: String,
    anchor_terms: Vec<String>,
}

#[derive(Serialize)]
struct PartiesResp {
    region: String,
    parties: Vec<PartySummary>,
}

async fn parties(State(state): State<AppState>) -> Json<PartiesResp> {
    let reg = &state.settings.registry;
    let parties = reg
        .ids()
        .into_iter()
        .filter_map(|id| reg.lookup(id))
        .map(|p| PartySummary {
            id: p.id.clone(),
            search_terms: reg.search_term(&p.id, state.region()),
            anchor_terms: p.anchor_terms(),
        })
        .collect();
    Json(PartiesResp {
        region: state.region().to_string(),
        parties,
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RankReq {
    party: String,
    source: String,
    #[serde(default)]
    items: Value,
    #[serde(default)]
    strictness: Option<Strictness>,
    #[serde(default, alias = "min_score")]
    min_score: Option<i32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RankResp {
    party: String,
    source: SourceType,
    min_score: i32,
    total: usize,
    kept: usize,
    items: Vec<ScoredItem>,
}

async fn rank_items(
    State(state): State<AppState>,
    payload: Result<Json<RankReq>, JsonRejection>,
) -> ApiResult<RankResp> {
    let Json(req) = payload?;
    let source: SourceType = req.source.parse()?;
    let items = normalize_batch(&raw_batch(req.items)?, source);
    let min_score = req.min_score.unwrap_or_else(|| {
        state
            .settings
            .thresholds
            .min_score(req.strictness.unwrap_or_default())
    });

    let scope = state.settings.registry.resolve(&req.party);
    let (ranked, stats) = rank_with_stats(&state.scorer, &items, scope, min_score);
    stats.record();

    Ok(Json(RankResp {
        party: scope.label().to_string(),
        source,
        min_score,
        total: stats.input,
        kept: stats.kept,
        items: ranked,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AggregateReq {
    party: String,
    #[serde(default)]
    feeds: Map<String, Value>,
    #[serde(default, alias = "min_score")]
    min_score: Option<i32>,
}

async fn aggregate_feeds(
    State(state): State<AppState>,
    payload: Result<Json<AggregateReq>, JsonRejection>,
) -> ApiResult<AggregationReport> {
    let Json(req) = payload?;
    let feeds = parse_feeds(req.feeds)?;

    let scope = state.settings.registry.resolve(&req.party);
    let min_score = req
        .min_score
        .unwrap_or(state.settings.thresholds.lenient);
    let report = FeedAggregator::new(&state.scorer)
        .with_top_keywords(state.settings.top_keywords)
        .aggregate(&feeds, scope, min_score);
    Ok(Json(report))
}

/// `{tag: [raw items]}` → normalized batches keyed by source.
fn parse_feeds(
    raw: Map<String, Value>,
) -> Result<BTreeMap<SourceType, Vec<NormalizedItem>>, ApiError> {
    let mut feeds: BTreeMap<SourceType, Vec<NormalizedItem>> = BTreeMap::new();
    for (tag, batch) in raw {
        let source: SourceType = tag.parse()?;
        let items = normalize_batch(&raw_batch(batch)?, source);
        feeds.entry(source).or_default().extend(items);
    }
    Ok(feeds)
}

#[derive(Deserialize)]
struct QualityReq {
    #[serde(default)]
    items: Value,
    #[serde(default)]
    source: Option<String>,
}

async fn quality(payload: Result<Json<QualityReq>, JsonRejection>) -> ApiResult<QualityReport> {
    let Json(req) = payload?;
    if let Some(tag) = req.source.as_deref() {
        tag.parse::<SourceType>()?;
    }
    Ok(Json(validate_data_quality(&raw_batch(req.items)?)))
}

/// Free text, or raw items (`items` + `source`, or `feeds`) filtered for the party.
#[derive(Deserialize)]
struct SentimentReq {
    #[serde(default)]
    text: String,
    #[serde(default)]
    party: Option<String>,
    #[serde(default)]
    items: Value,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    feeds: Map<String, Value>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum SentimentResp {
    Text(SentimentAssessment),
    Party(PartySentiment),
}

async fn analyze_sentiment(
    State(state): State<AppState>,
    payload: Result<Json<SentimentReq>, JsonRejection>,
) -> ApiResult<SentimentResp> {
    let Json(req) = payload?;
    let subject = state.subject(req.party.as_deref());
    let parties = state.party_ids();

    if !req.text.trim().is_empty() {
        let assessment =
            advisory::analyze_sentiment(state.llm.as_ref(), &req.text, &subject, &parties).await;
        return Ok(Json(SentimentResp::Text(assessment)));
    }
    if req.items.is_null() && req.feeds.is_empty() {
        return Err(ApiError::InvalidArgument("text or items is required".into()));
    }

    let mut items = Vec::new();
    if !req.items.is_null() {
        let source = match req.source.as_deref() {
            Some(tag) => tag.parse()?,
            None => SourceType::News,
        };
        items.extend(normalize_batch(&raw_batch(req.items)?, source));
    }
    items.extend(parse_feeds(req.feeds)?.into_values().flatten());

    let scope = match req.party.as_deref() {
        Some(p) => state.settings.registry.resolve(p),
        None => PartyScope::Global,
    };
    let context = advisory::prepare_sentiment_context(
        &state.scorer,
        &items,
        scope,
        &state.settings.thresholds,
        state.region(),
    );
    let out =
        advisory::analyze_party_sentiment(state.llm.as_ref(), context, &subject, &parties).await;
    Ok(Json(SentimentResp::Party(out)))
}

#[derive(Deserialize)]
struct HeatmapReq {
    #[serde(default)]
    context: Option<String>,
}

async fn analyze_heatmap(
    State(state): State<AppState>,
    payload: Result<Json<HeatmapReq>, JsonRejection>,
) -> ApiResult<BTreeMap<String, u8>> {
    let Json(req) = payload?;
    let heat =
        advisory::analyze_heatmap(state.llm.as_ref(), req.context.as_deref(), state.region()).await;
    Ok(Json(heat))
}

/// A JSON array field, or 400 with `message`.
fn require_array(v: Option<Value>, message: &str) -> Result<Vec<Value>, ApiError> {
    match v {
        Some(Value::Array(items)) => Ok(items),
        _ => Err(ApiError::InvalidArgument(message.to_string())),
    }
}

#[derive(Deserialize)]
struct BotReq {
    #[serde(default)]
    posts: Option<Value>,
}

async fn bot_detection(
    State(state): State<AppState>,
    payload: Result<Json<BotReq>, JsonRejection>,
) -> ApiResult<BotReport> {
    let Json(req) = payload?;
    let posts = require_array(req.posts, "Posts array required")?;
    Ok(Json(advisory::analyze_bots(state.llm.as_ref(), &posts).await))
}

#[derive(Deserialize)]
struct PrReq {
    #[serde(default)]
    headlines: Option<Value>,
    #[serde(default)]
    party: Option<String>,
}

async fn pr_detection(
    State(state): State<AppState>,
    payload: Result<Json<PrReq>, JsonRejection>,
) -> ApiResult<PrReport> {
    let Json(req) = payload?;
    let headlines = require_array(req.headlines, "Headlines array required")?;
    let subject = match req.party.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        Some(p) => p.to_string(),
        None => "political parties".to_string(),
    };
    let report =
        advisory::analyze_pr(state.llm.as_ref(), &headlines, &subject, state.region()).await;
    Ok(Json(report))
}

#[derive(Deserialize)]
struct ValidateReq {
    #[serde(default)]
    data: Value,
    #[serde(default)]
    context: Option<String>,
}

async fn validate_data(
    State(state): State<AppState>,
    payload: Result<Json<ValidateReq>, JsonRejection>,
) -> ApiResult<DataValidation> {
    let Json(req) = payload?;
    if req.data.is_null() {
        return Err(ApiError::InvalidArgument("data is required".into()));
    }
    let context = match req.context.filter(|c| !c.trim().is_empty()) {
        Some(c) => c,
        None => format!("{} politics", state.region()),
    };
    Ok(Json(
        advisory::validate_with_llm(state.llm.as_ref(), &req.data, &context).await,
    ))
}

#[derive(Deserialize)]
struct GenerateReq {
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default)]
    system: Option<String>,
}

#[derive(Deserialize)]
struct StrategistReq {
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default)]
    party: Option<String>,
    #[serde(default, alias = "systemPrompt")]
    system_prompt: Option<String>,
}

#[derive(Serialize)]
struct GenerateResp {
    provider: &'static str,
    content: String,
}

fn require_prompt(prompt: Option<String>) -> Result<String, ApiError> {
    prompt
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| ApiError::InvalidArgument("Missing prompt".into()))
}

async fn call_llm(
    state: &AppState,
    prompt: &str,
    system: Option<&str>,
) -> ApiResult<GenerateResp> {
    let provider = state.llm.provider_name();
    match state.llm.generate(prompt, system).await {
        Ok(content) => Ok(Json(GenerateResp { provider, content })),
        Err(e) => {
            warn!(provider, error = %e, "llm generate failed");
            let message = match e {
                LlmError::Status { status, body } => format!("HTTP {status}: {body}"),
                other => other.to_string(),
            };
            Err(ApiError::Upstream { provider, message })
        }
    }
}

async fn llm_generate(
    State(state): State<AppState>,
    payload: Result<Json<GenerateReq>, JsonRejection>,
) -> ApiResult<GenerateResp> {
    let Json(req) = payload?;
    let prompt = require_prompt(req.prompt)?;
    call_llm(&state, &prompt, req.system.as_deref()).await
}

async fn llm_strategist(
    State(state): State<AppState>,
    payload: Result<Json<StrategistReq>, JsonRejection>,
) -> ApiResult<GenerateResp> {
    let Json(req) = payload?;
    let prompt = require_prompt(req.prompt)?;
    let system = match req.system_prompt.filter(|s| !s.trim().is_empty()) {
        Some(custom) => custom,
        None => {
            let scope = match req.party.as_deref() {
                Some(p) => state.settings.registry.resolve(p),
                None => PartyScope::Global,
            };
            advisory::strategist_system_prompt(scope, &state.party_ids(), state.region())
        }
    };
    call_llm(&state, &prompt, Some(&system)).await
}
