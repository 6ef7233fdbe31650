//! Backtest Report - Coverage and Summary Tables
//!
//! Renders per-method coverage (analyzed vs selected) and the stored
//! per-method pick summary as text tables for the CLI.

use serde::Serialize;
use tabled::{Table, Tabled};

use crate::domain::market::Method;
use crate::domain::skip::SkipReason;
use crate::ports::pick_repository::MethodSummary;

use super::backtest_runner::Coverage;

/// One coverage line.
#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct CoverageRow {
  pub method: String,
  pub analyzed: u64,
  pub selected: u64,
  #[tabled(rename = "selected %")]
  pub selected_pct: String,
}

fn pct(selected: u64, analyzed: u64) -> String {
  if analyzed == 0 {
    "-".to_string()
  } else {
    format!("{:.2}", selected as f64 / analyzed as f64 * 100.0)
  }
}

/// Rows per method (in `methods` order) followed by a `total` row.
pub fn coverage_rows(coverage: &Coverage, methods: &[Method]) -> Vec<CoverageRow> {
  let mut rows: Vec<CoverageRow> = methods
    .iter()
    .map(|&m| {
      let (analyzed, selected) = (coverage.analyzed(m), coverage.selected(m));
      CoverageRow {
        method: m.as_str().to_string(),
        analyzed,
        selected,
        selected_pct: pct(selected, analyzed),
      }
    })
    .collect();

  let analyzed: u64 = rows.iter().map(|r| r.analyzed).sum();
  let selected: u64 = rows.iter().map(|r| r.selected).sum();
  rows.push(CoverageRow {
    method: "total".to_string(),
    analyzed,
    selected,
    selected_pct: pct(selected, analyzed),
  });
  rows
}

/// Coverage table plus one line per non-zero skip reason.
pub fn render_coverage(coverage: &Coverage, methods: &[Method]) -> String {
  let mut out = Table::new(coverage_rows(coverage, methods)).to_string();
  let skips: Vec<String> = SkipReason::ALL
    .iter()
    .filter(|&&r| coverage.skipped(r) > 0)
    .map(|&r| format!("{r}={}", coverage.skipped(r)))
    .collect();
  if !skips.is_empty() {
    out.push_str("\nskipped: ");
    out.push_str(&skips.join(", "));
  }
  out
}

#[derive(Debug, Clone, Serialize, Tabled)]
struct SummaryRow {
  method: &'static str,
  picks: usize,
  #[tabled(rename = "avg ROI %")]
  avg_roi: String,
  #[tabled(rename = "avg EV %")]
  avg_ev: String,
  #[tabled(rename = "avg odds")]
  avg_odds: String,
  #[tabled(rename = "avg fair")]
  avg_fair: String,
  #[tabled(rename = "avg w")]
  avg_weight: String,
  #[tabled(rename = "normal %")]
  normal: String,
  #[tabled(rename = "ROI range")]
  roi_range: String,
}

impl From<&MethodSummary> for SummaryRow {
  fn from(s: &MethodSummary) -> Self {
    Self {
      method: s.method.as_str(),
      picks: s.count,
      avg_roi: format!("{:.2}", s.avg_roi_pct),
      avg_ev: format!("{:.2}", s.avg_ev_pct),
      avg_odds: format!("{:.3}", s.avg_odds),
      avg_fair: format!("{:.3}", s.avg_fair_odds),
      avg_weight: format!("{:.3}", s.avg_prior_weight),
      normal: format!("{:.1}", s.normal_fraction * 100.0),
      roi_range: format!("{:.2}..{:.2}", s.min_roi_pct, s.max_roi_pct),
    }
  }
}

/// Per-method summary table of stored picks.
pub fn render_summary(summary: &[MethodSummary]) -> String {
  if summary.is_empty() {
    return "(no picks stored)".to_string();
  }
  Table::new(summary.iter().map(SummaryRow::from)).to_string()
}
