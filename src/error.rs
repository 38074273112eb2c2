use chrono::NaiveDate;
use thiserror::Error;

/// Malformed input the engine refuses to coerce.
///
/// Missing prices and provider outages are not errors: they degrade to an
/// unresolved quote and the wager is excluded.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("wager {wager_id} has no legs")]
    EmptyWager { wager_id: String },

    #[error("wager {wager_id} has {legs} legs but {quotes} resolved quotes")]
    QuoteCountMismatch {
        wager_id: String,
        legs: usize,
        quotes: usize,
    },

    #[error("wager {wager_id}: {field} must be a finite non-negative number, got {value}")]
    InvalidAmount {
        wager_id: String,
        field: &'static str,
        value: f64,
    },

    #[error("settled wager {wager_id} has no net profit")]
    MissingNetProfit { wager_id: String },

    #[error("invalid trend range: {start} is after {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("date {date} has no end-of-day cutoff")]
    DateOutOfRange { date: NaiveDate },
}
