// src/metrics.rs
//! Prometheus exposition for the pipeline counters.

use anyhow::Context;
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

const FETCH_MS_BUCKETS: &[f64] = &[50.0, 100.0, 250.0, 500.0, 1_000.0, 2_500.0, 5_000.0, 10_000.0, 20_000.0];

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Call once per process.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .set_buckets_for_metric(Matcher::Full("extract_fetch_ms".to_string()), FETCH_MS_BUCKETS)
            .context("prometheus: fetch latency buckets")?
            .install_recorder()
            .context("prometheus: install recorder")?;

        describe_counter!("classify_route_total", "Records classified, by route.");
        describe_counter!("classify_dropped_total", "Records dropped during classification.");
        describe_counter!("load_rows_total", "Rows written by the load stage.");
        describe_counter!("load_failures_total", "Load batches rolled back.");
        describe_gauge!("pipeline_watermark", "Last committed extraction watermark (unix s).");

        Ok(Self { handle })
    }

    /// `/metrics` in the Prometheus text format; merge into the read API.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route("/metrics", get(move || std::future::ready(handle.render())))
    }
}
