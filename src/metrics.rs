// src/metrics.rs
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder and describe the pipeline series.
    /// Fails if a recorder is already installed.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| anyhow::anyhow!("prometheus: install recorder: {e}"))?;
        describe();
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

fn describe() {
    describe_counter!("pipeline_items_total", "Items entering the rank pipeline.");
    describe_counter!(
        "pipeline_items_kept_total",
        "Items that passed gate and threshold."
    );
    describe_counter!(
        "pipeline_gate_rejected_total",
        "Items without any primary or leader keyword."
    );
    describe_counter!("aggregate_runs_total", "Completed aggregation calls.");
    describe_counter!(
        "feed_provider_errors_total",
        "Provider fetches that failed and were replaced by an empty list."
    );
    describe_counter!(
        "feed_http_status_errors_total",
        "Provider HTTP responses with a non-success status."
    );
    describe_counter!(
        "llm_fallback_total",
        "LLM calls that failed or returned unparseable output."
    );
    describe_histogram!("feed_parse_ms", "RSS parse time in milliseconds.");
}
