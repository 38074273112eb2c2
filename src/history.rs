//! Persisted daily EV history: one entry per calendar date, last write wins.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvHistoryEntry {
    pub date: NaiveDate,
    pub total_ev: f64,
}

/// JSON-file-backed history. Missing file means empty history.
#[derive(Debug)]
pub struct EvHistory {
    path: PathBuf,
    entries: BTreeMap<NaiveDate, f64>,
}

impl EvHistory {
    pub fn open(path: &Path) -> Result<Self> {
        let entries = match std::fs::read_to_string(path) {
            Ok(content) => {
                let rows: Vec<EvHistoryEntry> = serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse EV history: {}", path.display()))?;
                rows.into_iter().map(|e| (e.date, e.total_ev)).collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read EV history: {}", path.display()))
            }
        };
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    /// Insert or overwrite the value for `date`. Returns the previous value.
    pub fn upsert(&mut self, date: NaiveDate, total_ev: f64) -> Option<f64> {
        self.entries.insert(date, total_ev)
    }

    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.entries.get(&date).copied()
    }

    /// Entries in date order.
    pub fn entries(&self) -> Vec<EvHistoryEntry> {
        self.entries
            .iter()
            .map(|(&date, &total_ev)| EvHistoryEntry { date, total_ev })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&self.entries())?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write EV history: {}", self.path.display()))?;
        tracing::debug!(path = %self.path.display(), entries = self.entries.len(), "saved EV history");
        Ok(())
    }
}
