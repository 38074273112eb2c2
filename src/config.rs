use crate::engine::markets::{AliasTable, MarketRegistry, VigTable, DEFAULT_VIG};
use crate::engine::resolver::{SelectionPolicy, MAX_LOOKBACK_ROWS};
use crate::feed::types::MarketKey;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub markets: Vec<MarketConfig>,
    /// Ledger participant name -> odds-source participant key.
    #[serde(default)]
    pub aliases: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    #[serde(default = "default_vig")]
    pub default_vig: f64,
    #[serde(default = "default_lookback_rows")]
    pub lookback_rows: usize,
    #[serde(default)]
    pub selection_policy: SelectionPolicy,
}

fn default_vig() -> f64 { DEFAULT_VIG }
fn default_lookback_rows() -> usize { MAX_LOOKBACK_ROWS }

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_vig: DEFAULT_VIG,
            lookback_rows: MAX_LOOKBACK_ROWS,
            selection_policy: SelectionPolicy::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DataConfig {
    #[serde(default = "default_ledger_path")]
    pub ledger_path: PathBuf,
    #[serde(default = "default_snapshots_path")]
    pub snapshots_path: PathBuf,
    #[serde(default = "default_history_path")]
    pub history_path: PathBuf,
}

fn default_ledger_path() -> PathBuf { PathBuf::from("data/ledger.json") }
fn default_snapshots_path() -> PathBuf { PathBuf::from("data/snapshots.json") }
fn default_history_path() -> PathBuf { PathBuf::from("data/ev_history.json") }

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            ledger_path: default_ledger_path(),
            snapshots_path: default_snapshots_path(),
            history_path: default_history_path(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    "futures_ev=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MarketConfig {
    pub event_type: String,
    pub event_label: String,
    /// Odds-source partition holding this market's snapshots.
    pub source: String,
    /// Overrides `engine.default_vig` for this market.
    pub vig: Option<f64>,
}

impl MarketConfig {
    pub fn key(&self) -> MarketKey {
        MarketKey::new(&self.event_type, &self.event_label)
    }
}

fn check_vig(label: &str, vig: f64) -> Result<()> {
    if !(0.0..1.0).contains(&vig) {
        anyhow::bail!("{} vig must be in [0, 1), got {}", label, vig);
    }
    Ok(())
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| "Failed to parse config TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        check_vig("default", self.engine.default_vig)?;
        if self.engine.lookback_rows == 0 || self.engine.lookback_rows > MAX_LOOKBACK_ROWS {
            anyhow::bail!(
                "lookback_rows must be between 1 and {}, got {}",
                MAX_LOOKBACK_ROWS,
                self.engine.lookback_rows
            );
        }

        let mut keys = HashSet::new();
        let mut sources = HashSet::new();
        for market in &self.markets {
            let key = market.key();
            if let Some(vig) = market.vig {
                check_vig(&key.to_string(), vig)?;
            }
            if !sources.insert(market.source.as_str()) {
                anyhow::bail!("odds source '{}' is mapped to more than one market", market.source);
            }
            if !keys.insert(key.clone()) {
                anyhow::bail!("market '{}' is configured twice", key);
            }
        }
        Ok(())
    }

    pub fn market_registry(&self) -> MarketRegistry {
        let mut registry = MarketRegistry::new();
        for market in &self.markets {
            registry.insert(market.key(), market.source.clone());
        }
        registry
    }

    pub fn alias_table(&self) -> AliasTable {
        AliasTable::new(self.aliases.clone())
    }

    pub fn vig_table(&self) -> VigTable {
        self.markets
            .iter()
            .filter_map(|m| m.vig.map(|v| (m.key(), v)))
            .fold(VigTable::new(self.engine.default_vig), |table, (key, vig)| {
                table.with_override(key, vig)
            })
    }
}
