// src/normalize.rs
//! Item normalizer: provider-shaped JSON records → one canonical `NormalizedItem`.
//!
//! Never fails on missing or oddly typed fields; a record that ends up with an
//! empty title and body is still returned (the pipeline decides what to drop).

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Per-field length cap (characters).
pub const MAX_FIELD_CHARS: usize = 1500;

const TITLE_KEYS: &[&str] = &["title"];
const DESCRIPTION_KEYS: &[&str] = &["description", "summary", "snippet"];
const CONTENT_KEYS: &[&str] = &["content", "text", "selftext", "body"];
const AUTHOR_KEYS: &[&str] = &["author", "rawAuthor", "creator", "channelTitle"];
const PUBLISHED_KEYS: &[&str] = &[
    "publishedAt",
    "published_at",
    "pubDate",
    "published",
    "seendate",
    "created_utc",
    "created_at",
    "date",
];
const LINK_KEYS: &[&str] = &["link", "url"];

/// Provider tag attached to every batch.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    News,
    NewsData,
    Webz,
    Gdelt,
    Reddit,
    Mastodon,
    YouTube,
    WorldBank,
}

impl SourceType {
    pub const ALL: [SourceType; 8] = [
        SourceType::News,
        SourceType::NewsData,
        SourceType::Webz,
        SourceType::Gdelt,
        SourceType::Reddit,
        SourceType::Mastodon,
        SourceType::YouTube,
        SourceType::WorldBank,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::News => "news",
            SourceType::NewsData => "newsdata",
            SourceType::Webz => "webz",
            SourceType::Gdelt => "gdelt",
            SourceType::Reddit => "reddit",
            SourceType::Mastodon => "mastodon",
            SourceType::YouTube => "youtube",
            SourceType::WorldBank => "worldbank",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let k = s.trim().to_ascii_lowercase();
        SourceType::ALL
            .into_iter()
            .find(|t| t.as_str() == k)
            .ok_or_else(|| CoreError::invalid(format!("unknown source type `{s}`")))
    }
}

/// A provider record of arbitrary shape. Read-only to the core.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawItem(Map<String, Value>);

impl RawItem {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Accept a JSON object; anything else is a contract violation.
    pub fn from_value(v: Value) -> Result<Self, CoreError> {
        match v {
            Value::Object(m) => Ok(Self(m)),
            other => Err(CoreError::invalid(format!(
                "raw item must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// First non-empty string among `keys`.
    fn text(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .filter_map(|k| self.0.get(*k))
            .filter_map(Value::as_str)
            .map(str::trim)
            .find(|s| !s.is_empty())
    }

    /// Cleaned title, empty when absent.
    pub fn title(&self) -> String {
        self.text(TITLE_KEYS).map(clean_text).unwrap_or_default()
    }

    /// A non-empty title or content field. Descriptions alone do not count.
    pub fn has_title_or_content(&self) -> bool {
        [TITLE_KEYS, CONTENT_KEYS]
            .iter()
            .any(|keys| self.text(keys).is_some_and(|t| !clean_text(t).is_empty()))
    }

    fn timestamp(&self) -> Option<DateTime<Utc>> {
        PUBLISHED_KEYS
            .iter()
            .filter_map(|k| self.0.get(*k))
            .find_map(|v| match v {
                Value::String(s) => parse_timestamp(s),
                Value::Number(n) => n
                    .as_i64()
                    .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
                    .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
                _ => None,
            })
    }
}

impl From<Map<String, Value>> for RawItem {
    fn from(m: Map<String, Value>) -> Self {
        Self(m)
    }
}

/// Split a JSON array into raw items. Non-arrays and non-object elements are
/// rejected with `InvalidArgument`.
pub fn raw_batch(v: Value) -> Result<Vec<RawItem>, CoreError> {
    match v {
        Value::Array(items) => items.into_iter().map(RawItem::from_value).collect(),
        Value::Null => Ok(Vec::new()),
        other => Err(CoreError::invalid(format!(
            "items must be a JSON array, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Canonical record every later stage works on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedItem {
    pub title: String,
    /// Description and content, space-joined.
    pub body: String,
    pub source_type: SourceType,
    pub published_at: Option<DateTime<Utc>>,
    pub link: Option<String>,
    pub raw_author: Option<String>,
}

impl NormalizedItem {
    /// Minimal constructor used by adapters and tests.
    pub fn new(source_type: SourceType, title: &str, body: &str) -> Self {
        Self {
            title: title.to_string(),
            body: body.to_string(),
            source_type,
            published_at: None,
            link: None,
            raw_author: None,
        }
    }

    pub fn published(mut self, at: DateTime<Utc>) -> Self {
        self.published_at = Some(at);
        self
    }

    /// `title + " " + body`, the text every matcher looks at.
    pub fn full_text(&self) -> String {
        if self.body.is_empty() {
            return self.title.clone();
        }
        format!("{} {}", self.title, self.body)
    }

    pub fn is_blank(&self) -> bool {
        self.title.is_empty() && self.body.is_empty()
    }
}

/// Map one provider record into the canonical shape.
pub fn normalize(raw: &RawItem, source_type: SourceType) -> NormalizedItem {
    let title = raw.title();
    let description = raw.text(DESCRIPTION_KEYS).map(clean_text).unwrap_or_default();
    let content = raw.text(CONTENT_KEYS).map(clean_text).unwrap_or_default();

    let body = match (description.is_empty(), content.is_empty()) {
        (false, false) => format!("{description} {content}"),
        (false, true) => description,
        (true, _) => content,
    };

    NormalizedItem {
        title,
        body,
        source_type,
        published_at: raw.timestamp(),
        link: raw.text(LINK_KEYS).map(str::to_string),
        raw_author: raw.text(AUTHOR_KEYS).map(clean_text).filter(|a| !a.is_empty()),
    }
}

pub fn normalize_batch(raws: &[RawItem], source_type: SourceType) -> Vec<NormalizedItem> {
    raws.iter().map(|r| normalize(r, source_type)).collect()
}

/// Clean one text field: decode entities, strip tags, fold quotes, collapse
/// whitespace, cap length.
pub fn clean_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags (Mastodon statuses arrive as HTML)
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("ws regex"));
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 5) Length cap
    if out.chars().count() > MAX_FIELD_CHARS {
        out = out.chars().take(MAX_FIELD_CHARS).collect();
    }

    out
}

/// Parse the timestamp formats providers are known to emit.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // GDELT `seendate`
    for fmt in ["%Y%m%dT%H%M%SZ", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0).map(|n| Utc.from_utc_datetime(&n));
    }
    if let Ok(secs) = s.parse::<i64>() {
        return Utc.timestamp_opt(secs, 0).single();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(v: Value) -> RawItem {
        RawItem::from_value(v).unwrap()
    }

    #[test]
    fn missing_fields_become_empty() {
        let n = normalize(&raw(json!({})), SourceType::News);
        assert_eq!(n.title, "");
        assert_eq!(n.body, "");
        assert!(n.published_at.is_none());
        assert!(n.link.is_none());
        assert!(n.raw_author.is_none());
        assert!(n.is_blank());
    }

    #[test]
    fn description_and_content_are_joined() {
        let n = normalize(
            &raw(json!({"title": "T", "description": "desc", "content": "more"})),
            SourceType::NewsData,
        );
        assert_eq!(n.body, "desc more");
        assert_eq!(n.full_text(), "T desc more");
    }

    #[test]
    fn mastodon_html_is_cleaned() {
        let n = normalize(
            &raw(json!({
                "content": "<p>DMK&nbsp;rally in <b>Chennai</b></p>",
                "author": "Someone",
                "url": "https://mastodon.social/@x/1"
            })),
            SourceType::Mastodon,
        );
        assert_eq!(n.body, "DMK rally in Chennai");
        assert_eq!(n.raw_author.as_deref(), Some("Someone"));
        assert_eq!(n.link.as_deref(), Some("https://mastodon.social/@x/1"));
    }

    #[test]
    fn non_string_fields_are_ignored() {
        let n = normalize(
            &raw(json!({"title": 42, "description": null, "content": ["x"]})),
            SourceType::Reddit,
        );
        assert!(n.is_blank());
    }

    #[test]
    fn timestamps_in_provider_formats() {
        let a = parse_timestamp("2024-01-02T10:00:00Z").unwrap();
        let b = parse_timestamp("Tue, 02 Jan 2024 10:00:00 +0000").unwrap();
        let c = parse_timestamp("20240102T100000Z").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
        let d = parse_timestamp("2024-01-02").unwrap();
        assert!(d < a);
        assert!(parse_timestamp("yesterday").is_none());

        let n = normalize(&raw(json!({"created_utc": 1_704_189_600})), SourceType::Reddit);
        assert_eq!(n.published_at, Some(a));
    }

    #[test]
    fn reddit_float_created_utc_is_truncated_to_seconds() {
        let expected = parse_timestamp("2024-01-02T10:00:00Z").unwrap();
        let n = normalize(
            &raw(json!({"title": "DMK", "created_utc": 1_704_189_600.0})),
            SourceType::Reddit,
        );
        assert_eq!(n.published_at, Some(expected));
        let n = normalize(&raw(json!({"created_utc": 1_704_189_600.75})), SourceType::Reddit);
        assert_eq!(n.published_at, Some(expected));
    }

    #[test]
    fn batch_rejects_non_arrays() {
        assert!(raw_batch(json!({"title": "x"})).is_err());
        assert!(raw_batch(json!([1, 2])).is_err());
        assert_eq!(raw_batch(json!(null)).unwrap().len(), 0);
        assert_eq!(raw_batch(json!([{"title": "x"}])).unwrap().len(), 1);
    }

    #[test]
    fn source_type_parses_case_insensitively() {
        assert_eq!("YouTube".parse::<SourceType>().unwrap(), SourceType::YouTube);
        assert!("myspace".parse::<SourceType>().is_err());
    }
}
