//! Prometheus Metrics Registry - Backtest Observability
//!
//! Registers and exposes Prometheus metrics for backtest and
//! optimizer runs. Served on the configured bind address at `/metrics`.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use prometheus::{
    Encoder, Gauge, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};

use crate::domain::market::Method;
use crate::domain::skip::SkipReason;

/// Centralized Prometheus metrics for the engine.
///
/// All metrics follow the naming convention `totals_edge_*`.
pub struct MetricsRegistry {
    /// Prometheus registry.
    registry: Registry,
    /// Over/under sides analyzed, per method.
    pub pairs_analyzed: IntCounterVec,
    /// Picks emitted, per method.
    pub picks_selected: IntCounterVec,
    /// Matchups or lines skipped, per reason.
    pub matchups_skipped: IntCounterVec,
    /// Grid-search trials scored.
    pub optimizer_trials: IntCounter,
    /// Best optimizer score seen in the last search.
    pub optimizer_best_score: Gauge,
    /// Phase wall-clock duration (seconds).
    pub phase_duration_seconds: HistogramVec,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let pairs_analyzed = IntCounterVec::new(
            Opts::new(
                "totals_edge_pairs_analyzed_total",
                "Over/under sides analyzed",
            ),
            &["method"],
        )?;

        let picks_selected = IntCounterVec::new(
            Opts::new("totals_edge_picks_selected_total", "Picks emitted"),
            &["method"],
        )?;

        let matchups_skipped = IntCounterVec::new(
            Opts::new(
                "totals_edge_matchups_skipped_total",
                "Lines or matchups skipped without an estimate",
            ),
            &["reason"],
        )?;

        let optimizer_trials = IntCounter::new(
            "totals_edge_optimizer_trials_total",
            "Grid-search trials scored",
        )?;

        let optimizer_best_score = Gauge::new(
            "totals_edge_optimizer_best_score",
            "Best configuration score from the last grid search",
        )?;

        let phase_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "totals_edge_phase_duration_seconds",
                "Wall-clock duration of a run phase",
            )
            .buckets(vec![0.1, 0.5, 1.0, 5.0, 30.0, 120.0, 600.0, 3600.0]),
            &["phase"],
        )?;

        // Register all metrics
        registry.register(Box::new(pairs_analyzed.clone()))?;
        registry.register(Box::new(picks_selected.clone()))?;
        registry.register(Box::new(matchups_skipped.clone()))?;
        registry.register(Box::new(optimizer_trials.clone()))?;
        registry.register(Box::new(optimizer_best_score.clone()))?;
        registry.register(Box::new(phase_duration_seconds.clone()))?;

        Ok(Self {
            registry,
            pairs_analyzed,
            picks_selected,
            matchups_skipped,
            optimizer_trials,
            optimizer_best_score,
            phase_duration_seconds,
        })
    }

    pub fn record_method(&self, method: Method, analyzed: u64, selected: u64) {
        self.pairs_analyzed
            .with_label_values(&[method.as_str()])
            .inc_by(analyzed);
        self.picks_selected
            .with_label_values(&[method.as_str()])
            .inc_by(selected);
    }

    pub fn record_skips(&self, reason: SkipReason, count: u64) {
        self.matchups_skipped
            .with_label_values(&[reason.as_str()])
            .inc_by(count);
    }

    pub fn record_search(&self, trials: u64, best_score: f64) {
        self.optimizer_trials.inc_by(trials);
        self.optimizer_best_score.set(best_score);
    }

    pub fn observe_phase(&self, phase: &str, seconds: f64) {
        self.phase_duration_seconds
            .with_label_values(&[phase])
            .observe(seconds);
    }

    /// Text exposition of every registered metric.
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            warn!(error = %e, "Failed to encode metrics");
        }
        String::from_utf8(buffer).unwrap_or_default()
    }

    /// Serve Prometheus metrics on the configured bind address.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn serve(
        self: Arc<Self>,
        bind_address: String,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        let metrics_self = Arc::clone(&self);

        let app = Router::new().route(
            "/metrics",
            get(move || {
                let metrics = Arc::clone(&metrics_self);
                async move { metrics.render() }
            }),
        );

        let listener = tokio::net::TcpListener::bind(&bind_address).await?;
        info!(address = %bind_address, "Prometheus metrics server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_recorded_series() {
        let m = MetricsRegistry::new().unwrap();
        m.record_method(Method::MedianTotalTest, 10, 2);
        m.record_skips(SkipReason::InsufficientHistory, 3);
        m.record_search(64, 1.25);

        let text = m.render();
        assert!(text.contains("totals_edge_pairs_analyzed_total{method=\"median_total_test\"} 10"));
        assert!(text.contains("totals_edge_matchups_skipped_total{reason=\"insufficient_history\"} 3"));
        assert!(text.contains("totals_edge_optimizer_best_score 1.25"));
    }
}
