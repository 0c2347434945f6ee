// src/feeds/rss.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::feeds::FeedProvider;
use crate::normalize::{RawItem, SourceType};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

/// RSS 2.0 adapter (`channel/item`), from a fixture string or over HTTP.
pub struct RssProvider {
    name: String,
    source_type: SourceType,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl RssProvider {
    /// Serve a fixed document; the query is ignored.
    pub fn from_fixture_str(name: &str, source_type: SourceType, xml: &str) -> Self {
        Self {
            name: name.to_string(),
            source_type,
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    /// GET `url?q=<query>` on every fetch.
    pub fn from_url(name: &str, source_type: SourceType, url: &str) -> Self {
        Self {
            name: name.to_string(),
            source_type,
            mode: Mode::Http {
                url: url.to_string(),
                client: reqwest::Client::new(),
            },
        }
    }

    fn parse_items_from_str(s: &str) -> Result<Vec<RawItem>> {
        let t0 = std::time::Instant::now();
        let xml_clean = scrub_html_entities_for_xml(s);
        let rss: Rss = from_str(&xml_clean).context("parsing rss xml")?;

        let mut out = Vec::with_capacity(rss.channel.item.len());
        for it in rss.channel.item {
            let mut fields = Map::new();
            for (key, val) in [
                ("title", it.title),
                ("link", it.link),
                ("pubDate", it.pub_date),
                ("description", it.description),
            ] {
                if let Some(v) = val {
                    fields.insert(key.to_string(), Value::String(v));
                }
            }
            out.push(RawItem::new(fields));
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("feed_parse_ms").record(ms);
        Ok(out)
    }
}

#[async_trait]
impl FeedProvider for RssProvider {
    async fn fetch(&self, query: &str) -> Result<Vec<RawItem>> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse_items_from_str(s),
            Mode::Http { url, client } => {
                let resp = client
                    .get(url.as_str())
                    .query(&[("q", query)])
                    .send()
                    .await
                    .with_context(|| format!("{} http get()", self.name))?;
                let status = resp.status();
                if !status.is_success() {
                    counter!("feed_http_status_errors_total").increment(1);
                    anyhow::bail!("{} returned HTTP {}", self.name, status);
                }
                let body = resp
                    .text()
                    .await
                    .with_context(|| format!("{} http .text()", self.name))?;
                Self::parse_items_from_str(&body)
            }
        }
    }

    fn source_type(&self) -> SourceType {
        self.source_type
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// quick-xml only knows the five XML entities
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}
