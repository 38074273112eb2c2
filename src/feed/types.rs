use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Normalized internal types shared by the engine and its collaborators.

/// One futures market, e.g. ("Championship", "NBA Championship").
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct MarketKey {
    pub event_type: String,
    pub event_label: String,
}

impl MarketKey {
    pub fn new(event_type: impl Into<String>, event_label: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            event_label: event_label.into(),
        }
    }
}

impl fmt::Display for MarketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.event_type, self.event_label)
    }
}

/// One outcome-bet inside a wager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    #[serde(flatten)]
    pub market: MarketKey,
    pub participant: String,
}

impl Leg {
    pub fn new(market: MarketKey, participant: impl Into<String>) -> Self {
        Self {
            market,
            participant: participant.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WagerStatus {
    Active,
    Win,
    Loss,
    Cashout,
}

impl WagerStatus {
    pub fn is_settled(self) -> bool {
        !matches!(self, WagerStatus::Active)
    }
}

/// A wager as recorded by the ledger. The engine only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wager {
    pub id: String,
    pub portfolio: String,
    pub league: String,
    pub stake: f64,
    pub potential_payout: f64,
    pub status: WagerStatus,
    /// Realized profit; only meaningful once the wager is settled.
    #[serde(default)]
    pub net_profit: Option<f64>,
    pub placed_at: DateTime<Utc>,
    #[serde(default)]
    pub settled_at: Option<DateTime<Utc>>,
    pub legs: Vec<Leg>,
}

impl Wager {
    pub fn is_parlay(&self) -> bool {
        self.legs.len() > 1
    }

    /// Lifecycle status as it stood at `as_of`. A wager whose settlement
    /// happened after `as_of` was still open at that point.
    pub fn status_as_of(&self, as_of: DateTime<Utc>) -> WagerStatus {
        match self.settled_at {
            Some(settled) if settled > as_of => WagerStatus::Active,
            _ => self.status,
        }
    }
}

/// Portfolio x league filter applied by the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub portfolio: String,
    pub league: Option<String>,
}

impl Scope {
    pub fn new(portfolio: impl Into<String>, league: Option<String>) -> Self {
        Self {
            portfolio: portfolio.into(),
            league,
        }
    }

    pub fn matches(&self, wager: &Wager) -> bool {
        wager.portfolio == self.portfolio
            && self
                .league
                .as_deref()
                .map_or(true, |league| wager.league.eq_ignore_ascii_case(league))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    Active,
    Settled,
    Any,
}

impl StatusFilter {
    pub fn accepts(self, status: WagerStatus) -> bool {
        match self {
            StatusFilter::Active => !status.is_settled(),
            StatusFilter::Settled => status.is_settled(),
            StatusFilter::Any => true,
        }
    }
}

/// A sportsbook quote exactly as the odds source stored it.
///
/// Sources are inconsistent: some columns hold integers, some hold strings
/// like `"+450"`, some hold nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawQuote {
    Integer(i64),
    Float(f64),
    Text(String),
    Missing,
}

/// One timestamped row of quotes for a (source partition, participant) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsSnapshotRow {
    pub source: String,
    pub participant: String,
    pub timestamp: DateTime<Utc>,
    /// Sportsbook column name -> raw quote.
    #[serde(default)]
    pub quotes: BTreeMap<String, RawQuote>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn wager(status: WagerStatus, settled_at: Option<DateTime<Utc>>) -> Wager {
        Wager {
            id: "w-1".into(),
            portfolio: "main".into(),
            league: "NBA".into(),
            stake: 10.0,
            potential_payout: 50.0,
            status,
            net_profit: Some(40.0),
            placed_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            settled_at,
            legs: vec![Leg::new(MarketKey::new("Championship", "NBA Championship"), "Celtics")],
        }
    }

    #[test]
    fn test_status_as_of_before_settlement_is_active() {
        let settled = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let w = wager(WagerStatus::Win, Some(settled));
        let before = Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap();
        assert_eq!(w.status_as_of(before), WagerStatus::Active);
        assert_eq!(w.status_as_of(settled), WagerStatus::Win);
    }

    #[test]
    fn test_status_without_settlement_time_is_final() {
        let w = wager(WagerStatus::Loss, None);
        let any = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(w.status_as_of(any), WagerStatus::Loss);
    }

    #[test]
    fn test_scope_matches_league_case_insensitive() {
        let w = wager(WagerStatus::Active, None);
        assert!(Scope::new("main", None).matches(&w));
        assert!(Scope::new("main", Some("nba".into())).matches(&w));
        assert!(!Scope::new("main", Some("NFL".into())).matches(&w));
        assert!(!Scope::new("other", None).matches(&w));
    }

    #[test]
    fn test_raw_quote_deserializes_mixed_columns() {
        let json = r#"{
            "source": "nba_championship",
            "participant": "Celtics",
            "timestamp": "2025-02-01T12:00:00Z",
            "quotes": {"draftkings": 450, "fanduel": "+500", "betmgm": null, "caesars": 475.0}
        }"#;
        let row: OddsSnapshotRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.quotes["draftkings"], RawQuote::Integer(450));
        assert_eq!(row.quotes["fanduel"], RawQuote::Text("+500".into()));
        assert_eq!(row.quotes["betmgm"], RawQuote::Missing);
        assert_eq!(row.quotes["caesars"], RawQuote::Float(475.0));
    }

    #[test]
    fn test_leg_flattens_market_fields() {
        let json = r#"{"event_type": "MVP", "event_label": "NBA MVP", "participant": "Nikola Jokic"}"#;
        let leg: Leg = serde_json::from_str(json).unwrap();
        assert_eq!(leg.market, MarketKey::new("MVP", "NBA MVP"));
        assert_eq!(leg.participant, "Nikola Jokic");
    }
}
