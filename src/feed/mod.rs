pub mod ledger;
pub mod snapshots;
pub mod types;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use types::{OddsSnapshotRow, Scope, StatusFilter, Wager};

/// Historical odds keyed by source partition and participant.
#[async_trait]
pub trait OddsSnapshotProvider: Send + Sync {
    /// Rows at or before `cutoff`, newest first, at most `limit` of them.
    async fn list_snapshot_rows(
        &self,
        source: &str,
        participant: &str,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<OddsSnapshotRow>>;
}

/// The wager ledger. Implementations filter by scope and resolve each
/// wager's lifecycle status as of `as_of`.
#[async_trait]
pub trait WagerLedger: Send + Sync {
    async fn list_wagers(
        &self,
        scope: &Scope,
        status: StatusFilter,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<Wager>>;
}
