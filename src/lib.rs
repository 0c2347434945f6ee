// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod advisory;
pub mod aggregate;
pub mod api;
pub mod config;
pub mod error;
pub mod feeds;
pub mod llm;
pub mod metrics;
pub mod normalize;
pub mod party;
pub mod pipeline;
pub mod quality;
pub mod relevance;
pub mod sentiment;

pub use crate::aggregate::{AggregationReport, FeedAggregator};
pub use crate::api::{router, AppState};
pub use crate::config::Settings;
pub use crate::error::CoreError;
pub use crate::normalize::{normalize, NormalizedItem, RawItem, SourceType};
pub use crate::party::{PartyProfile, PartyRegistry, PartyScope, GLOBAL_PARTY};
pub use crate::pipeline::{rank, ScoredItem, Strictness, Thresholds};
pub use crate::relevance::RelevanceScorer;
