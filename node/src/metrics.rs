//! # Prometheus Metrics
//!
//! Node observability counters, gauges and histograms, served in text
//! exposition format on the dedicated metrics port. Everything lives in a
//! custom registry under a `verdant` namespace, so the node's series never
//! collide with a library's default registry.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::core::Collector;
use prometheus::{
    exponential_buckets, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge,
    Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// All Prometheus handles the node touches.
///
/// Handles are internally reference-counted: clones observe the same
/// series, and sharing across tasks happens through [`SharedMetrics`].
#[derive(Clone)]
pub struct NodeMetrics {
    registry: Registry,
    /// Records sealed into the chain by this node since startup.
    pub records_appended_total: IntCounter,
    /// Verification lookups, partitioned by `outcome`:
    /// `verified`, `unknown_hash` or `malformed`.
    pub verifications_total: IntCounterVec,
    /// Blocks in the chain, genesis included.
    pub chain_length: IntGauge,
    /// 1 while the last full revalidation passed, 0 once it failed.
    pub chain_valid: IntGauge,
    /// Time spent sealing one record, submission to appended block.
    pub append_latency_seconds: Histogram,
}

impl NodeMetrics {
    /// Builds and registers every metric. Called once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("verdant".into()), None)
            .expect("prometheus namespace is valid");

        let records_appended_total = IntCounter::new(
            "records_appended_total",
            "Records sealed into the chain by this node",
        )
        .expect("metric definition");

        let verifications_total = IntCounterVec::new(
            Opts::new("verifications_total", "Verification lookups by outcome"),
            &["outcome"],
        )
        .expect("metric definition");

        let chain_length = IntGauge::new("chain_length", "Blocks in the chain, genesis included")
            .expect("metric definition");

        let chain_valid =
            IntGauge::new("chain_valid", "1 while the last full revalidation passed")
                .expect("metric definition");

        let append_latency_seconds = Histogram::with_opts(
            HistogramOpts::new("append_latency_seconds", "Time spent sealing one record")
                .buckets(exponential_buckets(0.0005, 2.0, 12).expect("bucket layout")),
        )
        .expect("metric definition");

        register(&registry, &records_appended_total);
        register(&registry, &verifications_total);
        register(&registry, &chain_length);
        register(&registry, &chain_valid);
        register(&registry, &append_latency_seconds);

        Self {
            registry,
            records_appended_total,
            verifications_total,
            chain_length,
            chain_valid,
            append_latency_seconds,
        }
    }

    /// Renders every registered series in Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut out = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut out)?;
        Ok(String::from_utf8(out).expect("text exposition is utf-8"))
    }
}

/// Registers one collector handle with the registry.
///
/// Duplicate registration is the only failure mode, and every name in this
/// file is a distinct literal, so the `expect` states an invariant.
fn register<C: Collector + Clone + 'static>(registry: &Registry, collector: &C) {
    registry
        .register(Box::new(collector.clone()))
        .expect("metric registration");
}

/// Shared handle passed around the application.
pub type SharedMetrics = Arc<NodeMetrics>;

/// Axum handler backing `GET /metrics` on the metrics port.
pub async fn metrics_handler(State(metrics): State<SharedMetrics>) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("metric encoding failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
