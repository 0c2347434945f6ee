// src/advisory.rs
//! Prompt builders and response parsers around the LLM oracle: party-scoped
//! sentiment context, structured sentiment, district heat, bot and PR
//! detection, data validation and the strategist.
//!
//! Oracle output is untrusted. Anything that does not parse is a soft failure:
//! sentiment falls back to the lexical extractor, heat to an empty map, and the
//! detectors to a fixed "unavailable" report.

use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::llm::LlmClient;
use crate::normalize::NormalizedItem;
use crate::party::PartyScope;
use crate::pipeline::{rank, Strictness, Thresholds};
use crate::relevance::RelevanceScorer;
use crate::sentiment::{self, SentimentIndicators};

/// Items fed into one sentiment context.
pub const CONTEXT_ITEM_LIMIT: usize = 20;
/// Characters of input text quoted into the sentiment prompt.
pub const PROMPT_TEXT_LIMIT: usize = 2000;
/// Posts serialized into one bot-detection prompt.
pub const BOT_POST_LIMIT: usize = 50;

pub const HEATMAP_DISTRICTS: &[&str] = &[
    "Chennai",
    "Coimbatore",
    "Madurai",
    "Trichy",
    "Salem",
    "Tirunelveli",
];

const SENTIMENT_SYSTEM_PROMPT: &str =
    "You are a precise political sentiment analyzer. Output only valid JSON.";
const HEATMAP_SYSTEM_PROMPT: &str =
    "You are a political analyst. Output only valid JSON mapping districts to heat intensity integers.";
const BOT_SYSTEM_PROMPT: &str =
    "You are a bot detection specialist. Analyze social media patterns and output only valid JSON.";
const PR_SYSTEM_PROMPT: &str = "You are a media manipulation analyst. Output only valid JSON.";
const VALIDATION_SYSTEM_PROMPT: &str = "You are a precise data validator. Output only valid JSON.";

/* ----------------------------
Sentiment context
---------------------------- */

/// Party-scoped text block ready for a sentiment prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentContext {
    pub text: String,
    /// Items that passed the strict pipeline (before the 20-item cap).
    pub item_count: usize,
    pub party: String,
    pub keywords: Vec<String>,
    pub context: String,
}

/// Rank at `Strict`, keep the first 20, one line per item.
pub fn prepare_sentiment_context(
    scorer: &RelevanceScorer,
    items: &[NormalizedItem],
    scope: PartyScope<'_>,
    thresholds: &Thresholds,
    region: &str,
) -> SentimentContext {
    let ranked = rank(scorer, items, scope, thresholds.min_score(Strictness::Strict));
    let text = ranked
        .iter()
        .take(CONTEXT_ITEM_LIMIT)
        .map(|s| {
            if s.item.body.is_empty() {
                s.item.title.clone()
            } else {
                format!("{}. {}", s.item.title, s.item.body)
            }
        })
        .collect::<Vec<_>>()
        .join("\n");
    let party = scope.label().to_string();
    SentimentContext {
        text,
        item_count: ranked.len(),
        keywords: scope.profile().map(|p| p.anchor_terms()).unwrap_or_default(),
        context: format!(
            "Analyzing {} {}-related news items from {}",
            ranked.len(),
            party,
            region
        ),
        party,
    }
}

/* ----------------------------
Structured sentiment
---------------------------- */

/// What the oracle is asked to return. Scores are clamped on parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmSentiment {
    pub sentiment_score: f64,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub emotions: BTreeMap<String, f64>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub party_sentiment: BTreeMap<String, f64>,
}

/// Which signal produced `SentimentAssessment::score`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssessmentSource {
    Llm,
    Lexical,
}

/// LLM and lexical outputs side by side; never blended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentAssessment {
    pub source: AssessmentSource,
    pub score: f64,
    pub llm: Option<LlmSentiment>,
    pub lexical: SentimentIndicators,
}

pub fn build_sentiment_prompt(text: &str, subject: &str, parties: &[&str]) -> String {
    let quoted: String = text.chars().take(PROMPT_TEXT_LIMIT).collect();
    let party_lines = parties
        .iter()
        .map(|p| format!("    \"{p}\": -1.0 to 1.0"))
        .collect::<Vec<_>>()
        .join(",\n");
    format!(
        r#"Analyze the sentiment of this political text about {subject}.

Text: "{quoted}"

Return JSON with:
{{
  "sentiment_score": (number -1.0 to 1.0),
  "confidence": (0.0-1.0),
  "emotions": {{
    "anger": 0.0-1.0,
    "fear": 0.0-1.0,
    "joy": 0.0-1.0,
    "trust": 0.0-1.0,
    "sadness": 0.0-1.0,
    "disgust": 0.0-1.0,
    "anticipation": 0.0-1.0,
    "surprise": 0.0-1.0
  }},
  "keywords": ["list"],
  "party_sentiment": {{
{party_lines}
  }}
}}"#
    )
}

/// Remove Markdown code fences the oracle likes to wrap JSON in.
pub fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

/// Malformed or non-JSON output → `None`.
pub fn parse_llm_sentiment(raw: &str) -> Option<LlmSentiment> {
    let mut parsed: LlmSentiment = serde_json::from_str(&strip_code_fences(raw)).ok()?;
    parsed.sentiment_score = parsed.sentiment_score.clamp(-1.0, 1.0);
    parsed.confidence = parsed.confidence.clamp(0.0, 1.0);
    for v in parsed.party_sentiment.values_mut() {
        *v = v.clamp(-1.0, 1.0);
    }
    for v in parsed.emotions.values_mut() {
        *v = v.clamp(0.0, 1.0);
    }
    Some(parsed)
}

/// Ask the oracle; fall back to the lexical score when it fails or rambles.
pub async fn analyze_sentiment(
    client: &dyn LlmClient,
    text: &str,
    subject: &str,
    parties: &[&str],
) -> SentimentAssessment {
    let lexical = sentiment::extract(text);
    let prompt = build_sentiment_prompt(text, subject, parties);

    let llm = match client.generate(&prompt, Some(SENTIMENT_SYSTEM_PROMPT)).await {
        Ok(raw) => {
            let parsed = parse_llm_sentiment(&raw);
            if parsed.is_none() {
                debug!(target: "advisory", raw_len = raw.len(), "unparseable sentiment reply");
            }
            parsed
        }
        Err(e) => {
            warn!(provider = client.provider_name(), error = %e, "sentiment oracle failed");
            None
        }
    };

    match llm {
        Some(l) => SentimentAssessment {
            source: AssessmentSource::Llm,
            score: l.sentiment_score,
            llm: Some(l),
            lexical,
        },
        None => {
            counter!("llm_fallback_total").increment(1);
            SentimentAssessment {
                source: AssessmentSource::Lexical,
                score: lexical.score,
                llm: None,
                lexical,
            }
        }
    }
}

/// Sentiment over the strict-filtered items of one party.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartySentiment {
    #[serde(flatten)]
    pub assessment: SentimentAssessment,
    pub context: SentimentContext,
}

/// Run the oracle over a prepared context. An empty context never reaches the
/// oracle and reports a neutral lexical result.
pub async fn analyze_party_sentiment(
    client: &dyn LlmClient,
    context: SentimentContext,
    subject: &str,
    parties: &[&str],
) -> PartySentiment {
    let assessment = if context.text.is_empty() {
        debug!(target: "advisory", party = %context.party, "no relevant items for sentiment");
        SentimentAssessment {
            source: AssessmentSource::Lexical,
            score: 0.0,
            llm: None,
            lexical: sentiment::extract(""),
        }
    } else {
        analyze_sentiment(client, &context.text, subject, parties).await
    };
    PartySentiment {
        assessment,
        context,
    }
}

/* ----------------------------
District heat
---------------------------- */

pub fn build_heatmap_prompt(headlines: Option<&str>, region: &str) -> String {
    let headlines = headlines
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("General {region} political climate"));
    format!(
        "Based on the following recent news headlines about {region} politics, assign a \"political heat\" intensity (0-100) to key districts ({}).\n    Headlines: {headlines}\n    Return JSON only: {{ \"Chennai\": 50, ... }}",
        HEATMAP_DISTRICTS.join(", ")
    )
}

/// District → heat in ⟨0..100⟩. Non-numeric values are skipped; malformed → empty.
pub fn parse_heatmap(raw: &str) -> BTreeMap<String, u8> {
    let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&strip_code_fences(raw)) else {
        return BTreeMap::new();
    };
    map.into_iter()
        .filter_map(|(k, v)| {
            let heat = v.as_f64()?;
            Some((k, heat.round().clamp(0.0, 100.0) as u8))
        })
        .collect()
}

pub async fn analyze_heatmap(
    client: &dyn LlmClient,
    headlines: Option<&str>,
    region: &str,
) -> BTreeMap<String, u8> {
    let prompt = build_heatmap_prompt(headlines, region);
    match client.generate(&prompt, Some(HEATMAP_SYSTEM_PROMPT)).await {
        Ok(raw) => parse_heatmap(&raw),
        Err(e) => {
            warn!(provider = client.provider_name(), error = %e, "heatmap oracle failed");
            counter!("llm_fallback_total").increment(1);
            BTreeMap::new()
        }
    }
}

/* ----------------------------
Bot and PR detection
---------------------------- */

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotReport {
    pub bot_probability: f64,
    #[serde(default)]
    pub suspicious_patterns: Vec<String>,
    #[serde(default)]
    pub coordinated_accounts: Vec<String>,
    #[serde(default)]
    pub recommendation: String,
}

impl BotReport {
    pub fn unavailable() -> Self {
        Self {
            bot_probability: 0.0,
            suspicious_patterns: Vec::new(),
            coordinated_accounts: Vec::new(),
            recommendation: "Analysis failed".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrReport {
    pub pr_score: f64,
    #[serde(default)]
    pub is_artificial: bool,
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub affected_sources: Vec<String>,
    #[serde(default)]
    pub analysis: String,
}

impl PrReport {
    pub fn unavailable() -> Self {
        Self {
            pr_score: 0.0,
            is_artificial: false,
            patterns: Vec::new(),
            affected_sources: Vec::new(),
            analysis: "Analysis failed".into(),
        }
    }
}

pub fn build_bot_prompt(posts: &[Value]) -> String {
    let sample = &posts[..posts.len().min(BOT_POST_LIMIT)];
    let posts_json = serde_json::to_string(sample).unwrap_or_else(|_| "[]".into());
    format!(
        r#"Analyze these social media posts for bot network activity. Look for:
1. Repetitive phrasing patterns
2. Synchronized posting times
3. Similar account creation patterns
4. Coordinated messaging

Posts: {posts_json}

Return JSON: {{ "bot_probability": 0.0-1.0, "suspicious_patterns": ["list"], "coordinated_accounts": ["list"], "recommendation": "string" }}"#
    )
}

pub fn parse_bot_report(raw: &str) -> Option<BotReport> {
    let mut r: BotReport = serde_json::from_str(&strip_code_fences(raw)).ok()?;
    r.bot_probability = r.bot_probability.clamp(0.0, 1.0);
    Some(r)
}

pub async fn analyze_bots(client: &dyn LlmClient, posts: &[Value]) -> BotReport {
    let prompt = build_bot_prompt(posts);
    let raw = generate_or_log(client, &prompt, BOT_SYSTEM_PROMPT, "bot detection").await;
    raw.as_deref()
        .and_then(parse_bot_report)
        .unwrap_or_else(|| {
            counter!("llm_fallback_total").increment(1);
            BotReport::unavailable()
        })
}

pub fn build_pr_prompt(headlines: &[Value], subject: &str, region: &str) -> String {
    let headlines_json = serde_json::to_string(headlines).unwrap_or_else(|_| "[]".into());
    format!(
        r#"Analyze these news headlines for artificial PR amplification related to {subject} in {region}:

Headlines: {headlines_json}

Look for:
1. Sudden coordinated positive/negative coverage
2. Repetitive phrasing across sources
3. Timing patterns suggesting orchestrated release
4. Unnatural sentiment uniformity

Return JSON: {{ "pr_score": 0.0-1.0, "is_artificial": true/false, "patterns": ["list"], "affected_sources": ["list"], "analysis": "string" }}"#
    )
}

pub fn parse_pr_report(raw: &str) -> Option<PrReport> {
    let mut r: PrReport = serde_json::from_str(&strip_code_fences(raw)).ok()?;
    r.pr_score = r.pr_score.clamp(0.0, 1.0);
    Some(r)
}

pub async fn analyze_pr(
    client: &dyn LlmClient,
    headlines: &[Value],
    subject: &str,
    region: &str,
) -> PrReport {
    let prompt = build_pr_prompt(headlines, subject, region);
    let raw = generate_or_log(client, &prompt, PR_SYSTEM_PROMPT, "pr detection").await;
    raw.as_deref()
        .and_then(parse_pr_report)
        .unwrap_or_else(|| {
            counter!("llm_fallback_total").increment(1);
            PrReport::unavailable()
        })
}

/* ----------------------------
Data validation
---------------------------- */

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataValidation {
    pub is_valid: bool,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub summary: String,
}

impl DataValidation {
    /// Oracle unavailable: assume valid with half confidence.
    pub fn unavailable() -> Self {
        Self {
            is_valid: true,
            confidence: 0.5,
            issues: Vec::new(),
            summary: "Validation unavailable".into(),
        }
    }
}

pub fn build_validation_prompt(data: &Value, context: &str) -> String {
    let quoted: String = data.to_string().chars().take(PROMPT_TEXT_LIMIT).collect();
    format!(
        r#"You are a data validation expert. Analyze the following data and determine if it's valid, accurate, and relevant to {context}.

Data: {quoted}

Return JSON only with: {{ "is_valid": true/false, "confidence": 0.0-1.0, "issues": ["list of any issues found"], "summary": "brief summary" }}"#
    )
}

pub fn parse_validation(raw: &str) -> Option<DataValidation> {
    let mut v: DataValidation = serde_json::from_str(&strip_code_fences(raw)).ok()?;
    v.confidence = v.confidence.clamp(0.0, 1.0);
    Some(v)
}

pub async fn validate_with_llm(client: &dyn LlmClient, data: &Value, context: &str) -> DataValidation {
    let prompt = build_validation_prompt(data, context);
    let raw = generate_or_log(client, &prompt, VALIDATION_SYSTEM_PROMPT, "validation").await;
    raw.as_deref()
        .and_then(parse_validation)
        .unwrap_or_else(|| {
            counter!("llm_fallback_total").increment(1);
            DataValidation::unavailable()
        })
}

async fn generate_or_log(
    client: &dyn LlmClient,
    prompt: &str,
    system: &str,
    task: &'static str,
) -> Option<String> {
    match client.generate(prompt, Some(system)).await {
        Ok(raw) => Some(raw),
        Err(e) => {
            warn!(provider = client.provider_name(), error = %e, task, "oracle failed");
            None
        }
    }
}

/* ----------------------------
Strategist
---------------------------- */

/// Partisan advisor for a party; neutral summarizer for `Global`.
pub fn strategist_system_prompt(scope: PartyScope<'_>, rivals: &[&str], region: &str) -> String {
    if let PartyScope::Global = scope {
        return "You are the Chief Strategist AI module inside PoliticView. Summarize the situation and propose concise strategic options for a political leader. Write in short professional paragraphs without bullet points, numbering, or special formatting.".to_string();
    }
    let party = scope.label();
    let opponents = rivals
        .iter()
        .filter(|r| !r.eq_ignore_ascii_case(party))
        .copied()
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "You are the Chief Strategist for {party} in {region}. Your goal is to maximize {party}'s reach and reputation. \
Analyze all data to highlight POSITIVES for {party} and NEGATIVES/WEAKNESSES of opponents ({opponents}). \
Suggest specific actions to improve {party}'s standing. Be biased in favor of {party} but grounded in data. \
Provide clear, actionable recommendations in plain text paragraphs without bullet points, numbering, or special formatting."
    )
}
