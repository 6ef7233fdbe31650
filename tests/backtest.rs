//! Backtest - End-to-End Runs over a Synthetic Snapshot
//!
//! Builds a deterministic offline dataset, loads it through the
//! snapshot adapter and exercises the runner, coverage accounting,
//! the grid search and the report tables.

use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;

use rust_decimal::Decimal;

use totals_edge::adapters::snapshot::{Snapshot, SnapshotEvent, SnapshotOddsSource};
use totals_edge::domain::market::{BettingLine, EventInfo, Method, Side, StatType};
use totals_edge::domain::params::EngineConfig;
use totals_edge::domain::skip::SkipReason;
use totals_edge::usecases::report::render_coverage;
use totals_edge::usecases::{
    BacktestRunner, Dataset, DatasetLoader, ParameterGrid, ParameterOptimizer, SearchSettings,
};

const MARKET: &str = "Map 1 - Totals";

/// Deterministic pseudo-random series around `center`.
fn series(center: f64, spread: f64, seed: u64, len: usize) -> Vec<f64> {
    let mut state = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
    (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            let u = (state >> 11) as f64 / (1u64 << 53) as f64;
            (center + spread * (u - 0.5) * 2.0).round().max(0.0)
        })
        .collect()
}

fn line(side: &str, handicap: &str, stat: &str, odds: f64) -> BettingLine {
    BettingLine {
        selection: format!("{side} {handicap} {stat}"),
        handicap: handicap.parse::<Decimal>().unwrap(),
        odds,
    }
}

fn event(id: &str, home: &str, away: &str, lines: Vec<BettingLine>) -> SnapshotEvent {
    SnapshotEvent {
        event_id: id.to_string(),
        info: EventInfo {
            home_team: home.to_string(),
            away_team: away.to_string(),
            league_name: "LEC".to_string(),
            match_date: "2025-04-01".to_string(),
        },
        markets: BTreeMap::from([(MARKET.to_string(), lines)]),
    }
}

fn snapshot() -> Snapshot {
    let teams = ["Alpha", "Beta", "Gamma", "Delta", "Epsilon", "Zeta"];
    let mut series_map = BTreeMap::new();
    for (i, team) in teams.iter().enumerate() {
        let seed = i as u64 + 1;
        let center = 12.0 + 2.0 * i as f64;
        series_map.insert(
            team.to_string(),
            BTreeMap::from([
                (StatType::Kills, series(center, 6.0, seed, 25)),
                (StatType::Dragons, series(2.2, 1.5, seed + 100, 25)),
            ]),
        );
    }
    // Too short to profile.
    series_map.insert(
        "Rookies".to_string(),
        BTreeMap::from([(StatType::Kills, series(15.0, 4.0, 99, 10))]),
    );

    let mut events = Vec::new();
    for (n, (home, away)) in [
        ("Alpha", "Beta"),
        ("Gamma", "Delta"),
        ("Epsilon", "Zeta"),
        ("Alpha", "Zeta"),
        ("Beta", "Gamma"),
        ("Delta", "Epsilon"),
    ]
    .into_iter()
    .enumerate()
    {
        events.push(event(
            &format!("ev{n}"),
            home,
            away,
            vec![
                line("Over", "28.5", "Kills", 1.85),
                line("Under", "28.5", "Kills", 1.95),
                line("Over", "34.5", "Kills", 2.40),
                line("Under", "34.5", "Kills", 1.55),
                line("Over", "4.5", "Dragons", 1.90),
                line("Under", "4.5", "Dragons", 1.90),
            ],
        ));
    }
    events.push(event(
        "ev-short",
        "Rookies",
        "Alpha",
        vec![line("Over", "27.5", "Kills", 1.9), line("Under", "27.5", "Kills", 1.9)],
    ));
    events.push(event(
        "ev-odd",
        "Alpha",
        "Beta",
        vec![
            line("Over", "3.5", "Wards", 1.9),
            line("Under", "3.5", "Wards", 1.9),
            line("Over", "30.5", "Kills", 2.0),
        ],
    ));

    Snapshot {
        events,
        series: series_map,
    }
}

async fn dataset() -> Dataset {
    let source = SnapshotOddsSource::new(snapshot());
    DatasetLoader::new(vec![MARKET.to_string()], 50)
        .load(&source, &AtomicBool::new(false))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_coverage_accounts_for_every_pair() {
    let data = dataset().await;
    assert_eq!(data.events.len(), 8);

    let result = BacktestRunner::all_methods(EngineConfig::default()).run(&data, &AtomicBool::new(false));
    assert_eq!(result.events, 8);

    // 6 events × 3 pairs profile cleanly; ev-short's pair lacks history,
    // ev-odd has one unknown-stat pair and one lone over.
    for method in Method::ALL {
        assert_eq!(result.coverage.analyzed(method), 6 * 3 * 2, "{method:?}");
    }
    assert_eq!(result.coverage.skipped(SkipReason::InsufficientHistory), 1);
    assert_eq!(result.coverage.skipped(SkipReason::UnknownStat), 1);
    assert_eq!(result.coverage.skipped(SkipReason::UnpairedLine), 1);
    assert_eq!(result.coverage.skipped(SkipReason::MissingEvent), 0);

    let selected: u64 = Method::ALL.iter().map(|&m| result.coverage.selected(m)).sum();
    assert_eq!(selected as usize, result.picks.len());
}

#[tokio::test]
async fn test_picks_respect_selection_rules() {
    let data = dataset().await;
    let config = EngineConfig::default();
    let result = BacktestRunner::all_methods(config).run(&data, &AtomicBool::new(false));

    for pick in &result.picks {
        let e = pick.outcome.estimate;
        assert!(e.roi_pct > config.selection.min_roi);
        assert!(e.probabilities.posterior > e.probabilities.prior);
        assert!(pick.outcome.gate.is_open());
        assert_eq!(Side::from_selection(&pick.line.selection), e.side);
        assert_eq!(pick.line.odds, e.odds);
    }

    // Without allow_both_sides a method never backs both sides of a line.
    for (i, a) in result.picks.iter().enumerate() {
        for b in &result.picks[i + 1..] {
            let same_line = a.event.event_id == b.event.event_id
                && a.method() == b.method()
                && a.handicap() == b.handicap()
                && a.line.selection.split_whitespace().last() == b.line.selection.split_whitespace().last();
            assert!(!same_line, "both sides picked for {}", a.line.selection);
        }
    }
}

#[tokio::test]
async fn test_unreachable_roi_threshold_selects_nothing() {
    let data = dataset().await;
    let mut config = EngineConfig::default();
    config.selection.min_roi = 1e9;
    let result = BacktestRunner::all_methods(config).run(&data, &AtomicBool::new(false));

    assert!(result.picks.is_empty());
    // Coverage still counts every analyzed side.
    assert_eq!(result.coverage.analyzed(Method::BayesianMatchup), 36);
}

#[tokio::test]
async fn test_cancelled_run_evaluates_nothing() {
    let data = dataset().await;
    let result = BacktestRunner::all_methods(EngineConfig::default()).run(&data, &AtomicBool::new(true));
    assert_eq!(result.events, 0);
    assert!(result.picks.is_empty());
}

fn small_grid() -> ParameterGrid {
    ParameterGrid {
        prior_weight_floor: vec![0.50, 0.60],
        prior_weight_cap: vec![0.75],
        beta_prior: vec![(4.0, 4.0), (6.0, 6.0)],
        pvalue_max: vec![0.10, 0.25],
        min_abs_z: vec![0.8, 1.2],
        min_edge: vec![0.04],
        min_posterior_gain: vec![0.02],
        max_cv15: vec![70.0],
    }
}

#[tokio::test]
async fn test_grid_search_is_deterministic() {
    let data = dataset().await;
    let settings = SearchSettings {
        sample_event_count: 5,
        random_seed: 42,
    };
    let optimizer = ParameterOptimizer::new(small_grid(), settings);
    let cancel = AtomicBool::new(false);

    let a = optimizer.optimize(EngineConfig::default(), &data, &cancel);
    let b = optimizer.optimize(EngineConfig::default(), &data, &cancel);

    assert_eq!(a, b);
    assert_eq!(a.trials, small_grid().len());
    assert_eq!(a.sample_events, 5);
    if a.improved {
        assert!(a.score > a.baseline_score);
        assert_eq!(a.config.selection, EngineConfig::default().selection);
    } else {
        assert_eq!(a.config, EngineConfig::default());
        assert_eq!(a.score, a.baseline_score);
    }
}

#[tokio::test]
async fn test_committed_config_reproduces_score() {
    let data = dataset().await;
    let settings = SearchSettings {
        sample_event_count: 120,
        random_seed: 7,
    };
    let optimizer = ParameterOptimizer::new(small_grid(), settings);
    let outcome = optimizer.optimize(EngineConfig::default(), &data, &AtomicBool::new(false));

    let events = optimizer.sample_events(&data);
    let rescored = ParameterOptimizer::score(outcome.config, &data, &events);
    assert!((rescored - outcome.score).abs() < 1e-9);
}

#[tokio::test]
async fn test_coverage_table_renders() {
    let data = dataset().await;
    let result = BacktestRunner::all_methods(EngineConfig::default()).run(&data, &AtomicBool::new(false));
    let table = render_coverage(&result.coverage, &Method::ALL);
    for method in Method::ALL {
        assert!(table.contains(method.as_str()));
    }
    assert!(table.contains("total"));
    assert!(table.contains("insufficient_history=1"));
}
