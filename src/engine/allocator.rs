//! Per-wager EV allocation.
//!
//! A wager's stake, expected payout (active) or realized profit (settled) is
//! split across its legs in proportion to each leg's odds excess
//! `decimal_odds - 1`.

use super::resolver::{Price, ResolvedQuote};
use crate::error::EngineError;
use crate::feed::types::{MarketKey, Wager};

/// One leg's share of a wager.
#[derive(Debug, Clone, PartialEq)]
pub struct LegAllocation {
    pub market: MarketKey,
    pub participant: String,
    pub weight: f64,
    pub stake: f64,
    pub expected_payout: f64,
    pub net_profit: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WagerAllocation {
    pub wager_id: String,
    pub settled: bool,
    /// Product of leg fair probabilities; only computed for active wagers.
    pub combined_probability: Option<f64>,
    pub expected_payout: Option<f64>,
    pub legs: Vec<LegAllocation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExclusionReason {
    /// At least one leg has no usable price.
    Unresolvable,
    /// Odds excess sums to zero or less; no meaningful weighting exists.
    Degenerate,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Allocation {
    Included(WagerAllocation),
    Unresolvable {
        wager_id: String,
        /// Indices into `wager.legs`.
        unpriced_legs: Vec<usize>,
    },
    Degenerate {
        wager_id: String,
        excess_sum: f64,
    },
}

impl Allocation {
    pub fn wager_id(&self) -> &str {
        match self {
            Allocation::Included(a) => &a.wager_id,
            Allocation::Unresolvable { wager_id, .. } | Allocation::Degenerate { wager_id, .. } => wager_id,
        }
    }

    pub fn exclusion(&self) -> Option<ExclusionReason> {
        match self {
            Allocation::Included(_) => None,
            Allocation::Unresolvable { .. } => Some(ExclusionReason::Unresolvable),
            Allocation::Degenerate { .. } => Some(ExclusionReason::Degenerate),
        }
    }

    pub fn included(&self) -> Option<&WagerAllocation> {
        match self {
            Allocation::Included(a) => Some(a),
            _ => None,
        }
    }
}

/// Odds-excess weights for a set of legs. `Err(excess_sum)` when the excess
/// sum is not positive. A single leg always gets weight 1.0.
pub fn allocation_weights(prices: &[Price]) -> Result<Vec<f64>, f64> {
    if prices.len() == 1 {
        return Ok(vec![1.0]);
    }
    let excess: Vec<f64> = prices.iter().map(|p| p.decimal_odds - 1.0).collect();
    let denom: f64 = excess.iter().sum();
    if !(denom > 0.0) {
        return Err(denom);
    }
    Ok(excess.into_iter().map(|e| e / denom).collect())
}

/// Legs are assumed independent.
pub fn combined_probability(prices: &[Price]) -> f64 {
    prices.iter().map(|p| p.fair_probability).product()
}

fn check_amount(wager_id: &str, field: &'static str, value: f64) -> Result<(), EngineError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidAmount {
            wager_id: wager_id.to_string(),
            field,
            value,
        })
    }
}

/// Allocate one wager across its legs.
///
/// `quotes` holds one resolved quote per leg, in leg order. Settled wagers
/// are weighted with the quotes as given, i.e. the prices at evaluation time
/// rather than at placement.
pub fn allocate_wager(wager: &Wager, quotes: &[ResolvedQuote]) -> Result<Allocation, EngineError> {
    if wager.legs.is_empty() {
        return Err(EngineError::EmptyWager {
            wager_id: wager.id.clone(),
        });
    }
    if quotes.len() != wager.legs.len() {
        return Err(EngineError::QuoteCountMismatch {
            wager_id: wager.id.clone(),
            legs: wager.legs.len(),
            quotes: quotes.len(),
        });
    }
    check_amount(&wager.id, "stake", wager.stake)?;
    check_amount(&wager.id, "potential_payout", wager.potential_payout)?;

    let settled = wager.status.is_settled();
    let net_profit = if settled {
        match wager.net_profit {
            Some(p) if p.is_finite() => p,
            Some(p) => {
                return Err(EngineError::InvalidAmount {
                    wager_id: wager.id.clone(),
                    field: "net_profit",
                    value: p,
                })
            }
            None => {
                return Err(EngineError::MissingNetProfit {
                    wager_id: wager.id.clone(),
                })
            }
        }
    } else {
        0.0
    };

    let mut prices = Vec::with_capacity(quotes.len());
    let mut unpriced_legs = Vec::new();
    for (i, quote) in quotes.iter().enumerate() {
        match quote.price() {
            Some(p) if p.fair_probability > 0.0 && p.decimal_odds.is_finite() => prices.push(p),
            _ => unpriced_legs.push(i),
        }
    }
    if !unpriced_legs.is_empty() {
        return Ok(Allocation::Unresolvable {
            wager_id: wager.id.clone(),
            unpriced_legs,
        });
    }

    let weights = match allocation_weights(&prices) {
        Ok(w) => w,
        Err(excess_sum) => {
            return Ok(Allocation::Degenerate {
                wager_id: wager.id.clone(),
                excess_sum,
            })
        }
    };

    let (combined, expected_payout) = if settled {
        (None, None)
    } else {
        let p = combined_probability(&prices);
        (Some(p), Some(wager.potential_payout * p))
    };

    let legs = wager
        .legs
        .iter()
        .zip(&weights)
        .map(|(leg, &weight)| LegAllocation {
            market: leg.market.clone(),
            participant: leg.participant.clone(),
            weight,
            stake: if settled { 0.0 } else { weight * wager.stake },
            expected_payout: expected_payout.map_or(0.0, |ep| weight * ep),
            net_profit: if settled { weight * net_profit } else { 0.0 },
        })
        .collect();

    Ok(Allocation::Included(WagerAllocation {
        wager_id: wager.id.clone(),
        settled,
        combined_probability: combined,
        expected_payout,
        legs,
    }))
}
