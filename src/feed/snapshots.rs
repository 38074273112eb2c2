//! File-backed odds snapshot store.
//!
//! The whole snapshot history is loaded into memory and indexed by
//! (source, participant); queries never touch the file again.

use super::types::OddsSnapshotRow;
use super::OddsSnapshotProvider;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct SnapshotFile {
    #[serde(default)]
    rows: Vec<OddsSnapshotRow>,
}

#[derive(Debug, Default)]
pub struct SnapshotStore {
    /// (source, participant) -> rows sorted oldest first.
    rows: HashMap<(String, String), Vec<OddsSnapshotRow>>,
}

impl SnapshotStore {
    pub fn from_rows(rows: impl IntoIterator<Item = OddsSnapshotRow>) -> Self {
        let mut index: HashMap<(String, String), Vec<OddsSnapshotRow>> = HashMap::new();
        for row in rows {
            index
                .entry((row.source.clone(), row.participant.clone()))
                .or_default()
                .push(row);
        }
        for series in index.values_mut() {
            series.sort_by_key(|r| r.timestamp);
        }
        Self { rows: index }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot file: {}", path.display()))?;
        let file: SnapshotFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse snapshot file: {}", path.display()))?;
        let store = Self::from_rows(file.rows);
        tracing::debug!(
            series = store.rows.len(),
            rows = store.row_count(),
            "loaded odds snapshots"
        );
        Ok(store)
    }

    pub fn row_count(&self) -> usize {
        self.rows.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl OddsSnapshotProvider for SnapshotStore {
    async fn list_snapshot_rows(
        &self,
        source: &str,
        participant: &str,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<OddsSnapshotRow>> {
        let Some(series) = self.rows.get(&(source.to_string(), participant.to_string())) else {
            return Ok(Vec::new());
        };
        // Series is sorted ascending, so everything before the partition point is eligible.
        let eligible = series.partition_point(|r| r.timestamp <= cutoff);
        Ok(series[..eligible]
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }
}
