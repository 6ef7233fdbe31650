//! Use Cases Layer - Application Workflows
//!
//! Orchestrates domain logic with port interfaces. Everything below
//! `dataset` is synchronous and runs over prefetched data.
//!
//! Use cases:
//! - `DatasetLoader`: Prefetch events, lines and team series
//! - `BacktestRunner`: Evaluate events with every method, collect coverage
//! - `ParameterOptimizer`: Grid search over method hyperparameters
//! - `BacktestService`: Load, optimize, evaluate and persist
//! - `report`: Coverage and summary tables

pub mod backtest_runner;
pub mod backtest_service;
pub mod dataset;
pub mod optimizer;
pub mod report;

pub use backtest_runner::{BacktestRunner, Coverage, Pick, RunResult};
pub use backtest_service::{BacktestReport, BacktestService};
pub use dataset::{Dataset, DatasetLoader, EventData, MarketData};
pub use optimizer::{ParameterGrid, ParameterOptimizer, SearchOutcome, SearchSettings};
