//! Recoverable reasons a line or matchup produces no estimate.

use serde::Serialize;

/// Expected no-signal outcomes. These are values, never errors: the
/// runner counts them and moves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// A team series had fewer than 15 samples, or was missing.
    InsufficientHistory,
    /// A handicap was quoted on one side only.
    UnpairedLine,
    /// Neither the market nor the selection names a known statistic.
    UnknownStat,
    /// Event metadata could not be found.
    MissingEvent,
}

impl SkipReason {
    pub const ALL: [Self; 4] = [
        Self::InsufficientHistory,
        Self::UnpairedLine,
        Self::UnknownStat,
        Self::MissingEvent,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::InsufficientHistory => "insufficient_history",
            Self::UnpairedLine => "unpaired_line",
            Self::UnknownStat => "unknown_stat",
            Self::MissingEvent => "missing_event",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
