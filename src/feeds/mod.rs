// src/feeds/mod.rs
//! Provider adapters and the concurrent collector feeding the aggregator.

pub mod rss;

use anyhow::Result;
use futures::future::join_all;
use metrics::counter;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::normalize::{normalize_batch, NormalizedItem, RawItem, SourceType};
use crate::quality::{english_only, DEFAULT_ENGLISH_THRESHOLD};

pub use rss::RssProvider;

/// One upstream feed. Implementations return raw records; the collector normalizes them.
#[async_trait::async_trait]
pub trait FeedProvider: Send + Sync {
    async fn fetch(&self, query: &str) -> Result<Vec<RawItem>>;
    fn source_type(&self) -> SourceType;
    fn name(&self) -> &str;
}

/// Fetch every provider concurrently and group the normalized items by source type.
///
/// A failing provider contributes an empty list (logged and counted); the
/// collection itself never fails. Providers sharing a type are concatenated in
/// provider order.
pub async fn collect_feeds(
    providers: &[Box<dyn FeedProvider>],
    query: &str,
    english_filter: bool,
) -> BTreeMap<SourceType, Vec<NormalizedItem>> {
    let results = join_all(providers.iter().map(|p| p.fetch(query))).await;

    let mut feeds: BTreeMap<SourceType, Vec<NormalizedItem>> = BTreeMap::new();
    for (p, res) in providers.iter().zip(results) {
        let source = p.source_type();
        let items = match res {
            Ok(raw) => {
                let mut items = normalize_batch(&raw, source);
                if english_filter {
                    items = english_only(items, DEFAULT_ENGLISH_THRESHOLD);
                }
                debug!(target: "feeds", provider = p.name(), %source, raw = raw.len(), kept = items.len(), "provider fetched");
                items
            }
            Err(e) => {
                warn!(error = ?e, provider = p.name(), %source, "provider error");
                counter!("feed_provider_errors_total").increment(1);
                Vec::new()
            }
        };
        feeds.entry(source).or_default().extend(items);
    }
    feeds
}
