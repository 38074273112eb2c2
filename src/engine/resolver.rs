//! Best-quote resolution: recent snapshot rows -> one vig-adjusted price.

use super::markets::{AliasTable, MarketRegistry, VigTable};
use super::odds::{normalize_odds, to_decimal_odds, to_implied_probability};
use crate::feed::types::{MarketKey, OddsSnapshotRow, Wager};
use crate::feed::OddsSnapshotProvider;
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Hard ceiling on how many snapshot rows one resolution may scan.
pub const MAX_LOOKBACK_ROWS: usize = 100;

/// How one quote is picked among a row's sportsbook columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionPolicy {
    /// Lowest implied probability in the newest row that has any quote.
    #[default]
    LongestPrice,
    /// Largest raw American-odds value in the newest row that has any quote.
    /// Differs from `LongestPrice` when malformed in-gap values (|odds| < 100) mix with real prices.
    HighestAmerican,
    /// Longest price, but only the single newest row is considered.
    FirstRow,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Price {
    pub decimal_odds: f64,
    pub fair_probability: f64,
}

/// Where a resolved price came from.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteOrigin {
    pub sportsbook: String,
    pub american_odds: i32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedQuote {
    Resolved {
        price: Price,
        origin: Option<QuoteOrigin>,
    },
    Unresolved,
}

impl ResolvedQuote {
    pub fn priced(decimal_odds: f64, fair_probability: f64) -> Self {
        ResolvedQuote::Resolved {
            price: Price {
                decimal_odds,
                fair_probability,
            },
            origin: None,
        }
    }

    pub fn price(&self) -> Option<Price> {
        match self {
            ResolvedQuote::Resolved { price, .. } => Some(*price),
            ResolvedQuote::Unresolved => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, ResolvedQuote::Resolved { .. })
    }

    /// Legacy `(decimal_odds, fair_probability)` pair; `(1.0, 0.0)` when unresolved.
    pub fn as_sentinel(&self) -> (f64, f64) {
        self.price()
            .map_or((1.0, 0.0), |p| (p.decimal_odds, p.fair_probability))
    }
}

/// Pick a (sportsbook, american_odds) pair from one row, ignoring absent quotes.
pub fn select_quote(row: &OddsSnapshotRow, policy: SelectionPolicy) -> Option<(&str, i32)> {
    let mut best: Option<(&str, i32)> = None;
    for (book, raw) in &row.quotes {
        let odds = normalize_odds(raw);
        if odds == 0 {
            continue;
        }
        let better = match best {
            None => true,
            Some((_, current)) => match policy {
                SelectionPolicy::LongestPrice | SelectionPolicy::FirstRow => {
                    to_implied_probability(odds) < to_implied_probability(current)
                }
                SelectionPolicy::HighestAmerican => odds > current,
            },
        };
        if better {
            best = Some((book.as_str(), odds));
        }
    }
    best
}

pub struct QuoteResolver<P> {
    provider: P,
    markets: MarketRegistry,
    aliases: AliasTable,
    vig: VigTable,
    policy: SelectionPolicy,
    lookback_rows: usize,
}

impl<P: OddsSnapshotProvider> QuoteResolver<P> {
    pub fn new(provider: P, markets: MarketRegistry, aliases: AliasTable, vig: VigTable) -> Self {
        Self {
            provider,
            markets,
            aliases,
            vig,
            policy: SelectionPolicy::default(),
            lookback_rows: MAX_LOOKBACK_ROWS,
        }
    }

    pub fn with_policy(mut self, policy: SelectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Clamped to `1..=MAX_LOOKBACK_ROWS`.
    pub fn with_lookback(mut self, rows: usize) -> Self {
        self.lookback_rows = rows.clamp(1, MAX_LOOKBACK_ROWS);
        self
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    pub fn markets(&self) -> &MarketRegistry {
        &self.markets
    }

    pub fn vig(&self) -> &VigTable {
        &self.vig
    }

    /// Resolve the best available price for `participant` in `market` as of `cutoff`.
    ///
    /// Never fails: an unknown market, empty history, all-absent quotes, or a
    /// provider error all come back as `Unresolved`.
    pub async fn resolve(
        &self,
        market: &MarketKey,
        participant: &str,
        cutoff: DateTime<Utc>,
    ) -> ResolvedQuote {
        let Some(source) = self.markets.source(market) else {
            tracing::debug!(market = %market, participant, "unknown market");
            return ResolvedQuote::Unresolved;
        };
        let canonical = self.aliases.canonical(participant);

        let limit = match self.policy {
            SelectionPolicy::FirstRow => 1,
            _ => self.lookback_rows,
        };

        let mut rows = match self
            .provider
            .list_snapshot_rows(source, canonical, cutoff, limit)
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(market = %market, participant = canonical, error = %e, "odds snapshot fetch failed");
                return ResolvedQuote::Unresolved;
            }
        };

        // Providers promise newest-first and cutoff-bounded rows; enforce it anyway.
        rows.retain(|r| r.timestamp <= cutoff);
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        rows.truncate(limit);

        for row in &rows {
            let Some((book, odds)) = select_quote(row, self.policy) else {
                continue;
            };
            let implied = to_implied_probability(odds);
            return ResolvedQuote::Resolved {
                price: Price {
                    decimal_odds: to_decimal_odds(odds),
                    fair_probability: self.vig.fair_probability(market, implied),
                },
                origin: Some(QuoteOrigin {
                    sportsbook: book.to_string(),
                    american_odds: odds,
                    timestamp: row.timestamp,
                }),
            };
        }

        tracing::debug!(market = %market, participant = canonical, rows = rows.len(), "no usable quote");
        ResolvedQuote::Unresolved
    }
}

type QuoteRequest = (MarketKey, String, DateTime<Utc>);

/// Resolved quotes for one portfolio pass, one resolution per distinct
/// (market, participant, cutoff).
#[derive(Debug, Default)]
pub struct QuoteBook {
    quotes: HashMap<QuoteRequest, ResolvedQuote>,
}

impl QuoteBook {
    pub async fn resolve_all<P, I>(resolver: &QuoteResolver<P>, requests: I) -> Self
    where
        P: OddsSnapshotProvider,
        I: IntoIterator<Item = QuoteRequest>,
    {
        let mut distinct: Vec<QuoteRequest> = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for request in requests {
            if seen.insert(request.clone()) {
                distinct.push(request);
            }
        }

        // Resolutions are independent reads; only the map insert below is shared.
        let resolved = join_all(
            distinct
                .iter()
                .map(|(market, participant, cutoff)| resolver.resolve(market, participant, *cutoff)),
        )
        .await;

        Self {
            quotes: distinct.into_iter().zip(resolved).collect(),
        }
    }

    /// Resolve every leg of `wagers` at `cutoff`.
    pub async fn for_wagers<'a, P, W>(resolver: &QuoteResolver<P>, wagers: W, cutoff: DateTime<Utc>) -> Self
    where
        P: OddsSnapshotProvider,
        W: IntoIterator<Item = &'a Wager>,
    {
        let requests: Vec<QuoteRequest> = wagers
            .into_iter()
            .flat_map(|w| w.legs.iter())
            .map(|leg| (leg.market.clone(), leg.participant.clone(), cutoff))
            .collect();
        Self::resolve_all(resolver, requests).await
    }

    pub fn get(&self, market: &MarketKey, participant: &str, cutoff: DateTime<Utc>) -> ResolvedQuote {
        self.quotes
            .get(&(market.clone(), participant.to_string(), cutoff))
            .cloned()
            .unwrap_or(ResolvedQuote::Unresolved)
    }

    /// Quotes for each leg of `wager`, in leg order.
    pub fn quotes_for(&self, wager: &Wager, cutoff: DateTime<Utc>) -> Vec<ResolvedQuote> {
        wager
            .legs
            .iter()
            .map(|leg| self.get(&leg.market, &leg.participant, cutoff))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn unresolved_count(&self) -> usize {
        self.quotes.values().filter(|q| !q.is_resolved()).count()
    }
}
