//! Pick Store - Append-only JSONL Pick Records
//!
//! Persists picks to `picks/backtest_picks.jsonl`. Each line is a
//! self-contained JSON record. Keys already on disk are loaded when
//! the store opens, so inserts are insert-or-ignore across runs.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::ports::pick_repository::{MethodSummary, PickKey, PickRecord, PickRepository};

/// File name of the pick log inside `picks/`.
pub const PICKS_FILE: &str = "backtest_picks.jsonl";

/// Append-only JSONL pick store with insert-or-ignore semantics.
pub struct JsonlPickStore {
    /// Directory holding the pick log.
    picks_dir: PathBuf,
    /// Full path of the pick log.
    path: PathBuf,
    /// Keys already persisted; the lock also serializes appends.
    known: Mutex<HashSet<PickKey>>,
}

impl JsonlPickStore {
    /// Open (or create) the store in the given data directory.
    pub async fn open(data_dir: &str) -> Result<Self> {
        let picks_dir = Path::new(data_dir).join("picks");
        fs::create_dir_all(&picks_dir)
            .await
            .context("Failed to create picks directory")?;
        let path = picks_dir.join(PICKS_FILE);

        let existing = read_records(&path).await?;
        let known: HashSet<PickKey> = existing.iter().map(PickRecord::key).collect();
        info!(path = %path.display(), stored = known.len(), "Pick store opened");

        Ok(Self {
            picks_dir,
            path,
            known: Mutex::new(known),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Reads every well-formed record; malformed lines are skipped.
async fn read_records(path: &Path) -> Result<Vec<PickRecord>> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read pick log {}", path.display()))?;

    let mut records = Vec::new();
    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<PickRecord>(line) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!(
                    file = %path.display(),
                    error = %e,
                    "Skipping malformed pick record"
                );
            }
        }
    }
    Ok(records)
}

#[async_trait]
impl PickRepository for JsonlPickStore {
    #[instrument(skip(self, picks), fields(submitted = picks.len()))]
    async fn save_picks(&self, picks: &[PickRecord]) -> Result<usize> {
        let mut known = self.known.lock().await;

        let mut buf = String::new();
        let mut fresh = Vec::new();
        for pick in picks {
            let key = pick.key();
            if known.contains(&key) || fresh.contains(&key) {
                debug!(
                    event_id = %pick.event_id,
                    method = %pick.method,
                    selection = %pick.selection,
                    "Duplicate pick ignored"
                );
                continue;
            }
            buf.push_str(&serde_json::to_string(pick).context("Failed to serialize pick record")?);
            buf.push('\n');
            fresh.push(key);
        }

        if fresh.is_empty() {
            return Ok(0);
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .context("Failed to open pick log file")?;
        file.write_all(buf.as_bytes())
            .await
            .context("Failed to write pick records")?;
        file.flush().await.context("Failed to flush pick log")?;

        let inserted = fresh.len();
        known.extend(fresh);
        info!(inserted, ignored = picks.len() - inserted, "Picks persisted");
        Ok(inserted)
    }

    async fn load_picks(&self) -> Result<Vec<PickRecord>> {
        // Hold the lock so a concurrent append is never half-read.
        let _guard = self.known.lock().await;
        read_records(&self.path).await
    }

    async fn summary_by_method(&self) -> Result<Vec<MethodSummary>> {
        let picks = self.load_picks().await?;
        Ok(MethodSummary::from_records(&picks))
    }

    async fn is_healthy(&self) -> bool {
        let test_path = self.picks_dir.join(".health_check");
        let result = fs::write(&test_path, b"ok").await;
        let _ = fs::remove_file(&test_path).await;
        result.is_ok()
    }
}
