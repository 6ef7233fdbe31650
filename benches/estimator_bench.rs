//! Estimator Benchmarks - Per-Pair and Per-Trial Cost
//!
//! A grid search runs every method over every sampled pair thousands
//! of times, so these are the hot paths.
//!
//! Run with: cargo bench --bench estimator_bench

use std::sync::atomic::AtomicBool;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rust_decimal_macros::dec;

use totals_edge::domain::estimator::{Matchup, estimator_for};
use totals_edge::domain::market::{BettingLine, EventInfo, LinePair, Method, StatType};
use totals_edge::domain::params::EngineConfig;
use totals_edge::usecases::dataset::{Dataset, EventData, MarketData};
use totals_edge::usecases::{BacktestRunner, ParameterOptimizer};

fn series(offset: f64) -> Vec<f64> {
    (0..30).map(|i| offset + f64::from((i * 7) % 11)).collect()
}

fn matchup() -> Matchup {
    Matchup::new(StatType::Kills, 27.5, 1.9, 1.9, &series(10.0), &series(12.0))
        .expect("series long enough")
}

/// Benchmark each estimation method on one pair.
fn bench_methods(c: &mut Criterion) {
    let m = matchup();
    let config = EngineConfig::default();

    for method in Method::ALL {
        c.bench_function(&format!("estimate_{}", method.as_str()), |b| {
            b.iter(|| estimator_for(method).estimate(black_box(&m), black_box(&config)));
        });
    }
}

/// Benchmark profile construction (includes the normality test).
fn bench_matchup_build(c: &mut Criterion) {
    let home = series(10.0);
    let away = series(12.0);

    c.bench_function("matchup_build", |b| {
        b.iter(|| Matchup::new(StatType::Kills, black_box(27.5), 1.9, 1.9, &home, &away));
    });
}

fn synthetic_dataset(events: usize) -> Dataset {
    let mut data = Dataset::default();
    for (i, team) in ["A", "B", "C", "D"].iter().enumerate() {
        data.series
            .insert((team.to_string(), StatType::Kills), series(8.0 + 2.0 * i as f64));
    }
    let pair = LinePair {
        handicap: dec!(27.5),
        over: BettingLine { selection: "Over 27.5 Kills".into(), handicap: dec!(27.5), odds: 2.05 },
        under: BettingLine { selection: "Under 27.5 Kills".into(), handicap: dec!(27.5), odds: 1.75 },
    };
    for i in 0..events {
        data.events.push(EventData {
            event_id: format!("ev{i}"),
            info: EventInfo {
                home_team: ["A", "B", "C", "D"][i % 4].to_string(),
                away_team: ["B", "C", "D", "A"][i % 4].to_string(),
                league_name: "LCK".into(),
                match_date: "2025-01-01".into(),
            },
            markets: vec![MarketData {
                market: "Map 1 - Totals".into(),
                pairs: vec![pair.clone(); 3],
                unpaired: 0,
            }],
        });
    }
    data
}

/// Benchmark one full run and one optimizer trial over 120 events.
fn bench_trial(c: &mut Criterion) {
    let data = synthetic_dataset(120);
    let events: Vec<&EventData> = data.events.iter().collect();
    let cancel = AtomicBool::new(false);

    c.bench_function("backtest_run_120_events", |b| {
        b.iter(|| BacktestRunner::all_methods(EngineConfig::default()).run(black_box(&data), &cancel));
    });

    c.bench_function("optimizer_trial_120_events", |b| {
        b.iter(|| ParameterOptimizer::score(EngineConfig::default(), black_box(&data), &events));
    });
}

criterion_group!(benches, bench_methods, bench_matchup_build, bench_trial);
criterion_main!(benches);
