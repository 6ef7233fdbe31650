//! Metrics Adapters
//!
//! Provides Prometheus metrics export via axum 0.7 for backtest
//! coverage, skip reasons and optimizer progress.

pub mod prometheus;

pub use prometheus::MetricsRegistry;
