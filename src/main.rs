//! totals-edge - Entry Point
//!
//! Wiring sequence:
//! 1. Parse CLI, load config.toml + validate
//! 2. Init tracing (JSON or pretty, `RUST_LOG` overrides the config level)
//! 3. Spawn the Prometheus server when enabled
//! 4. Install the Ctrl-C handler (sets the cancel flag, broadcasts shutdown)
//! 5. Open the odds source and the pick store
//! 6. Run the requested subcommand

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use totals_edge::adapters::metrics::MetricsRegistry;
use totals_edge::adapters::persistence::JsonlPickStore;
use totals_edge::adapters::snapshot::SnapshotOddsSource;
use totals_edge::adapters::sqlite::{SeriesWindow, SqliteOddsSource};
use totals_edge::config::{self, AppConfig, DataSourceKind};
use totals_edge::domain::market::Method;
use totals_edge::ports::odds_source::OddsSource;
use totals_edge::usecases::report::{render_coverage, render_summary};
use totals_edge::usecases::{BacktestService, DatasetLoader, ParameterOptimizer};

/// Multi-method value estimation for esports over/under totals.
#[derive(Parser, Debug)]
#[command(name = "totals-edge", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Optimize (if enabled), evaluate every event and persist picks
    Backtest,
    /// Grid search only; prints the best configuration as TOML
    Optimize,
    /// Print the stored per-method pick summary
    Summary,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::loader::load_config(&cli.config).context("Failed to load configuration")?;

    init_tracing(&config);
    info!(
        name = %config.bot.name,
        version = env!("CARGO_PKG_VERSION"),
        command = ?cli.command,
        "Starting totals-edge"
    );

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let cancel = Arc::new(AtomicBool::new(false));

    let metrics = if config.metrics.enabled {
        let registry = Arc::new(MetricsRegistry::new().context("Failed to create metrics registry")?);
        let server = Arc::clone(&registry);
        let bind = config.metrics.bind_address.clone();
        let rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            if let Err(e) = server.serve(bind, rx).await {
                error!(error = %e, "Metrics server failed");
            }
        });
        Some(registry)
    } else {
        None
    };

    let ctrl_c_cancel = Arc::clone(&cancel);
    let ctrl_c_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("SIGINT received, cancelling after the current step");
            ctrl_c_cancel.store(true, Ordering::Relaxed);
            let _ = ctrl_c_tx.send(());
        }
    });

    let result = match cli.command {
        Command::Summary => print_summary(&config).await,
        Command::Backtest | Command::Optimize => match config.data.source {
            DataSourceKind::Sqlite => {
                let window = SeriesWindow {
                    lookback_days: config.data.stats_lookback_days,
                    max_recent_matches: config.data.max_recent_matches,
                };
                let source = SqliteOddsSource::connect(
                    &config.data.odds_db_url,
                    &config.data.stats_db_url,
                    window,
                )
                .await
                .context("Failed to open odds/statistics databases")?;
                execute(cli.command, &config, Arc::new(source), metrics, cancel).await
            }
            DataSourceKind::Snapshot => {
                let source = SnapshotOddsSource::load(&config.data.snapshot_path).await?;
                execute(cli.command, &config, Arc::new(source), metrics, cancel).await
            }
        },
    };

    let _ = shutdown_tx.send(());
    if let Err(e) = &result {
        error!(error = %e, "Run failed");
    }
    result
}

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.bot.log_level));

    if config.bot.log_format == "json" {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).pretty().init();
    }
}

async fn execute<S: OddsSource>(
    command: Command,
    config: &AppConfig,
    source: Arc<S>,
    metrics: Option<Arc<MetricsRegistry>>,
    cancel: Arc<AtomicBool>,
) -> Result<()> {
    if !source.is_healthy().await {
        warn!("Odds source reports unhealthy, continuing");
    }
    let store = Arc::new(JsonlPickStore::open(&config.persistence.data_dir).await?);
    let loader = DatasetLoader::new(config.data.markets.clone(), config.data.series_limit);

    let run_optimizer = command == Command::Optimize || config.optimizer.enabled;
    let optimizer = run_optimizer.then(|| {
        ParameterOptimizer::new(config.optimizer.grid.clone(), config.optimizer.settings())
    });

    let mut service = BacktestService::new(source, store, loader, config.engine_config(), optimizer)
        .with_cancel_flag(cancel);
    if let Some(m) = metrics {
        service = service.with_metrics(m);
    }

    match command {
        Command::Optimize => {
            let data = service.load_dataset().await?;
            if let Some(outcome) = service.optimize(data).await? {
                info!(
                    score = outcome.score,
                    baseline = outcome.baseline_score,
                    trials = outcome.trials,
                    improved = outcome.improved,
                    "Grid search finished"
                );
                let toml = toml::to_string(&outcome.config).context("Failed to render configuration")?;
                println!("{toml}");
            }
        }
        Command::Backtest => {
            let report = service.run_backtest().await?;
            info!(
                run_id = %report.run_id,
                events = report.events,
                emitted = report.picks_emitted,
                inserted = report.picks_inserted,
                "Backtest report"
            );
            println!("{}", render_coverage(&report.coverage, &Method::ALL));
            println!();
            println!("{}", render_summary(&service.summary().await?));
        }
        Command::Summary => {}
    }
    Ok(())
}

async fn print_summary(config: &AppConfig) -> Result<()> {
    use totals_edge::ports::pick_repository::PickRepository;

    let store = JsonlPickStore::open(&config.persistence.data_dir).await?;
    println!("{}", render_summary(&store.summary_by_method().await?));
    Ok(())
}
