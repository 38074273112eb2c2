use super::types::{Scope, StatusFilter, Wager};
use super::WagerLedger;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::Path;

/// Wager ledger read from a JSON array of wagers.
#[derive(Debug, Default)]
pub struct LedgerBook {
    wagers: Vec<Wager>,
}

impl LedgerBook {
    pub fn from_wagers(wagers: Vec<Wager>) -> Self {
        Self { wagers }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read ledger file: {}", path.display()))?;
        let wagers: Vec<Wager> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse ledger file: {}", path.display()))?;
        tracing::debug!(count = wagers.len(), "loaded wager ledger");
        Ok(Self { wagers })
    }

    pub fn len(&self) -> usize {
        self.wagers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wagers.is_empty()
    }
}

#[async_trait]
impl WagerLedger for LedgerBook {
    async fn list_wagers(
        &self,
        scope: &Scope,
        status: StatusFilter,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<Wager>> {
        Ok(self
            .wagers
            .iter()
            .filter(|w| w.placed_at <= as_of && scope.matches(w))
            .filter_map(|w| {
                let as_of_status = w.status_as_of(as_of);
                if !status.accepts(as_of_status) {
                    return None;
                }
                let mut view = w.clone();
                view.status = as_of_status;
                if !as_of_status.is_settled() {
                    view.net_profit = None;
                }
                Some(view)
            })
            .collect())
    }
}
