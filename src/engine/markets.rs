//! Immutable lookup tables injected into the quote resolver.

use crate::feed::types::MarketKey;
use std::collections::HashMap;

pub const DEFAULT_VIG: f64 = 0.05;

/// MarketKey -> odds-source partition (table) name.
#[derive(Debug, Clone, Default)]
pub struct MarketRegistry {
    sources: HashMap<MarketKey, String>,
    order: Vec<MarketKey>,
}

impl MarketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_market(mut self, market: MarketKey, source: impl Into<String>) -> Self {
        self.insert(market, source);
        self
    }

    pub fn insert(&mut self, market: MarketKey, source: impl Into<String>) {
        if self.sources.insert(market.clone(), source.into()).is_none() {
            self.order.push(market);
        }
    }

    pub fn source(&self, market: &MarketKey) -> Option<&str> {
        self.sources.get(market).map(String::as_str)
    }

    /// Markets in registration order.
    pub fn markets(&self) -> impl Iterator<Item = (&MarketKey, &str)> {
        self.order
            .iter()
            .filter_map(|m| self.sources.get(m).map(|s| (m, s.as_str())))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Ledger participant name -> odds-source participant key.
/// Unmapped names pass through unchanged.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    aliases: HashMap<String, String>,
}

impl AliasTable {
    pub fn new(aliases: HashMap<String, String>) -> Self {
        Self { aliases }
    }

    pub fn canonical<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases.get(name).map_or(name, String::as_str)
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AliasTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Bookmaker margin removed from implied probability, with per-market overrides.
#[derive(Debug, Clone)]
pub struct VigTable {
    default: f64,
    overrides: HashMap<MarketKey, f64>,
}

impl Default for VigTable {
    fn default() -> Self {
        Self::new(DEFAULT_VIG)
    }
}

impl VigTable {
    pub fn new(default: f64) -> Self {
        Self {
            default,
            overrides: HashMap::new(),
        }
    }

    pub fn with_override(mut self, market: MarketKey, vig: f64) -> Self {
        self.overrides.insert(market, vig);
        self
    }

    pub fn default_vig(&self) -> f64 {
        self.default
    }

    pub fn vig_for(&self, market: &MarketKey) -> f64 {
        self.overrides.get(market).copied().unwrap_or(self.default)
    }

    /// Implied probability with this market's vig removed.
    pub fn fair_probability(&self, market: &MarketKey, implied: f64) -> f64 {
        implied * (1.0 - self.vig_for(market))
    }
}
