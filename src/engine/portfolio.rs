//! Portfolio aggregation: per-wager allocations folded into per-market totals.

use super::allocator::{allocate_wager, Allocation, ExclusionReason};
use super::resolver::{QuoteBook, QuoteResolver};
use crate::error::EngineError;
use crate::feed::types::{MarketKey, Scope, StatusFilter, Wager};
use crate::feed::{OddsSnapshotProvider, WagerLedger};
use anyhow::Result;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Money columns shared by market rows and the TOTAL row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Totals {
    pub active_stake: f64,
    pub active_expected_payout: f64,
    pub realized_net_profit: f64,
}

impl Totals {
    pub fn expected_value(&self) -> f64 {
        self.active_expected_payout - self.active_stake + self.realized_net_profit
    }

    fn absorb(&mut self, other: &Totals) {
        self.active_stake += other.active_stake;
        self.active_expected_payout += other.active_expected_payout;
        self.realized_net_profit += other.realized_net_profit;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketAggregate {
    pub market: MarketKey,
    #[serde(flatten)]
    pub totals: Totals,
    pub expected_value: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AllocationCounts {
    pub active_included: usize,
    pub settled_included: usize,
    pub unresolvable: usize,
    pub degenerate: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedWager {
    pub wager_id: String,
    pub reason: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioReport {
    pub as_of: DateTime<Utc>,
    /// Only markets that appear in at least one included wager, sorted by key.
    pub markets: Vec<MarketAggregate>,
    pub total: Totals,
    pub total_expected_value: f64,
    pub counts: AllocationCounts,
    pub skipped: Vec<SkippedWager>,
}

impl PortfolioReport {
    pub fn market(&self, key: &MarketKey) -> Option<&MarketAggregate> {
        self.markets.iter().find(|m| &m.market == key)
    }
}

/// Running per-market sums for one pass.
#[derive(Debug, Default)]
struct PortfolioAccumulator {
    markets: BTreeMap<MarketKey, Totals>,
    counts: AllocationCounts,
    skipped: Vec<SkippedWager>,
}

impl PortfolioAccumulator {
    fn record(&mut self, allocation: &Allocation) {
        let Some(included) = allocation.included() else {
            let reason = match allocation.exclusion() {
                Some(ExclusionReason::Degenerate) => {
                    self.counts.degenerate += 1;
                    "degenerate"
                }
                _ => {
                    self.counts.unresolvable += 1;
                    "unresolvable"
                }
            };
            tracing::debug!(wager_id = allocation.wager_id(), reason, "wager excluded");
            self.skipped.push(SkippedWager {
                wager_id: allocation.wager_id().to_string(),
                reason,
            });
            return;
        };

        if included.settled {
            self.counts.settled_included += 1;
        } else {
            self.counts.active_included += 1;
        }
        for leg in &included.legs {
            let totals = self.markets.entry(leg.market.clone()).or_default();
            totals.active_stake += leg.stake;
            totals.active_expected_payout += leg.expected_payout;
            totals.realized_net_profit += leg.net_profit;
        }
    }

    fn finish(self, as_of: DateTime<Utc>) -> PortfolioReport {
        let mut total = Totals::default();
        let markets = self
            .markets
            .into_iter()
            .map(|(market, totals)| {
                total.absorb(&totals);
                MarketAggregate {
                    market,
                    expected_value: totals.expected_value(),
                    totals,
                }
            })
            .collect();
        PortfolioReport {
            as_of,
            markets,
            total,
            total_expected_value: total.expected_value(),
            counts: self.counts,
            skipped: self.skipped,
        }
    }
}

/// Aggregate already-fetched wagers with odds as of `cutoff`.
///
/// Active wagers contribute stake and expected payout, settled wagers
/// contribute realized profit. Excluded wagers contribute nothing.
pub async fn evaluate_wagers<P: OddsSnapshotProvider>(
    resolver: &QuoteResolver<P>,
    active: &[Wager],
    settled: &[Wager],
    cutoff: DateTime<Utc>,
) -> Result<PortfolioReport, EngineError> {
    let quotes = QuoteBook::for_wagers(resolver, active.iter().chain(settled), cutoff).await;
    tracing::debug!(
        distinct = quotes.len(),
        unresolved = quotes.unresolved_count(),
        "resolved leg quotes"
    );

    let mut acc = PortfolioAccumulator::default();
    for wager in active.iter().chain(settled) {
        let allocation = allocate_wager(wager, &quotes.quotes_for(wager, cutoff))?;
        acc.record(&allocation);
    }
    Ok(acc.finish(cutoff))
}

/// Fetch the scope's wagers from the ledger as of `as_of` and aggregate them.
pub async fn evaluate_portfolio<P, L>(
    resolver: &QuoteResolver<P>,
    ledger: &L,
    scope: &Scope,
    as_of: DateTime<Utc>,
) -> Result<PortfolioReport>
where
    P: OddsSnapshotProvider,
    L: WagerLedger + ?Sized,
{
    let active = ledger.list_wagers(scope, StatusFilter::Active, as_of).await?;
    let settled = ledger.list_wagers(scope, StatusFilter::Settled, as_of).await?;
    let report = evaluate_wagers(resolver, &active, &settled, as_of).await?;
    tracing::info!(
        portfolio = %scope.portfolio,
        markets = report.markets.len(),
        active = report.counts.active_included,
        settled = report.counts.settled_included,
        unresolvable = report.counts.unresolvable,
        degenerate = report.counts.degenerate,
        ev = report.total_expected_value,
        "portfolio evaluated"
    );
    Ok(report)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub total_expected_value: f64,
    pub total: Totals,
    pub counts: AllocationCounts,
}

/// Last instant of `date` in UTC; the cutoff used for daily evaluation.
pub fn end_of_day(date: NaiveDate) -> Result<DateTime<Utc>, EngineError> {
    let next = date
        .checked_add_signed(Duration::days(1))
        .ok_or(EngineError::DateOutOfRange { date })?;
    Ok(Utc.from_utc_datetime(&next.and_time(NaiveTime::MIN)) - Duration::nanoseconds(1))
}

/// Portfolio EV for every calendar day in `[start, end]`.
///
/// Only wagers that are active in the ledger today take part. Each day is
/// evaluated from scratch with the subset placed by the end of that day and
/// odds observed up to then. Settled wagers never feed the trend.
pub async fn compute_trend<P, L>(
    resolver: &QuoteResolver<P>,
    ledger: &L,
    scope: &Scope,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<TrendPoint>>
where
    P: OddsSnapshotProvider,
    L: WagerLedger + ?Sized,
{
    if start > end {
        return Err(EngineError::InvalidDateRange { start, end }.into());
    }

    // Latest possible as-of: every wager visible, every status final.
    let current = ledger
        .list_wagers(scope, StatusFilter::Active, DateTime::<Utc>::MAX_UTC)
        .await?;

    let mut points = Vec::new();
    for date in start.iter_days().take_while(|d| *d <= end) {
        let cutoff = end_of_day(date)?;
        let placed: Vec<Wager> = current
            .iter()
            .filter(|w| w.placed_at <= cutoff)
            .cloned()
            .collect();
        let report = evaluate_wagers(resolver, &placed, &[], cutoff).await?;
        tracing::debug!(%date, wagers = placed.len(), ev = report.total_expected_value, "trend point");
        points.push(TrendPoint {
            date,
            total_expected_value: report.total_expected_value,
            total: report.total,
            counts: report.counts,
        });
    }
    tracing::info!(portfolio = %scope.portfolio, days = points.len(), active = current.len(), "trend computed");
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::allocator::{LegAllocation, WagerAllocation};

    fn leg(label: &str, stake: f64, payout: f64, profit: f64) -> LegAllocation {
        LegAllocation {
            market: MarketKey::new("Championship", label),
            participant: "Team".into(),
            weight: 1.0,
            stake,
            expected_payout: payout,
            net_profit: profit,
        }
    }

    #[test]
    fn test_accumulator_sums_by_market_and_total() {
        let mut acc = PortfolioAccumulator::default();
        acc.record(&Allocation::Included(WagerAllocation {
            wager_id: "a".into(),
            settled: false,
            combined_probability: Some(0.1),
            expected_payout: Some(60.0),
            legs: vec![leg("NBA", 10.0, 40.0, 0.0), leg("NFL", 5.0, 20.0, 0.0)],
        }));
        acc.record(&Allocation::Included(WagerAllocation {
            wager_id: "b".into(),
            settled: true,
            combined_probability: None,
            expected_payout: None,
            legs: vec![leg("NBA", 0.0, 0.0, -7.5)],
        }));
        acc.record(&Allocation::Degenerate {
            wager_id: "c".into(),
            excess_sum: 0.0,
        });
        acc.record(&Allocation::Unresolvable {
            wager_id: "d".into(),
            unpriced_legs: vec![0],
        });

        let report = acc.finish(Utc::now());
        assert_eq!(report.markets.len(), 2);
        let nba = report.market(&MarketKey::new("Championship", "NBA")).unwrap();
        assert_eq!(nba.totals.active_stake, 10.0);
        assert_eq!(nba.totals.realized_net_profit, -7.5);
        assert_eq!(nba.expected_value, 40.0 - 10.0 - 7.5);
        assert_eq!(report.total.active_stake, 15.0);
        assert_eq!(report.total_expected_value, 60.0 - 15.0 - 7.5);
        assert_eq!(
            report.counts,
            AllocationCounts {
                active_included: 1,
                settled_included: 1,
                unresolvable: 1,
                degenerate: 1,
            }
        );
        let reasons: Vec<_> = report.skipped.iter().map(|s| (s.wager_id.as_str(), s.reason)).collect();
        assert_eq!(reasons, vec![("c", "degenerate"), ("d", "unresolvable")]);
    }

    #[test]
    fn test_empty_accumulator_reports_nothing() {
        let report = PortfolioAccumulator::default().finish(Utc::now());
        assert!(report.markets.is_empty());
        assert_eq!(report.total, Totals::default());
        assert_eq!(report.total_expected_value, 0.0);
    }

    #[test]
    fn test_end_of_day_bounds() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let cutoff = end_of_day(date).unwrap();
        assert_eq!(cutoff.date_naive(), date);
        let next_midnight = Utc.with_ymd_and_hms(2025, 3, 2, 0, 0, 0).unwrap();
        assert!(cutoff < next_midnight);
        assert_eq!(next_midnight - cutoff, Duration::nanoseconds(1));
    }

    #[test]
    fn test_end_of_day_rejects_last_representable_date() {
        assert_eq!(
            end_of_day(NaiveDate::MAX),
            Err(EngineError::DateOutOfRange { date: NaiveDate::MAX })
        );
        assert!(end_of_day(NaiveDate::MAX.pred_opt().unwrap()).is_ok());
    }
}
