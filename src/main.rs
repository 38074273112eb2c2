use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use futures_ev::config::Config;
use futures_ev::engine::portfolio::{compute_trend, end_of_day, evaluate_portfolio};
use futures_ev::engine::QuoteResolver;
use futures_ev::feed::ledger::LedgerBook;
use futures_ev::feed::snapshots::SnapshotStore;
use futures_ev::feed::types::Scope;
use futures_ev::history::EvHistory;
use futures_ev::report;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "futures-ev")]
#[command(about = "Expected value of a sports-futures parlay portfolio")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Per-market stake, expected payout, realized profit and EV
    Table(TableArgs),
    /// Daily portfolio EV over a date range
    Trend(TrendArgs),
    /// List configured markets and their vig
    Markets,
}

#[derive(Args, Debug)]
struct ScopeArgs {
    /// Portfolio identifier
    #[arg(long, default_value = "main")]
    portfolio: String,

    /// Restrict to one league (e.g. NBA)
    #[arg(long)]
    league: Option<String>,
}

impl ScopeArgs {
    fn scope(&self) -> Scope {
        Scope::new(self.portfolio.clone(), self.league.clone())
    }
}

#[derive(Args, Debug)]
struct TableArgs {
    #[command(flatten)]
    scope: ScopeArgs,

    /// Evaluation cutoff: RFC 3339 timestamp or YYYY-MM-DD (end of day). Defaults to now.
    #[arg(long)]
    as_of: Option<String>,

    /// Emit JSON instead of a text table
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct TrendArgs {
    #[command(flatten)]
    scope: ScopeArgs,

    /// First date (YYYY-MM-DD)
    #[arg(long)]
    start: NaiveDate,

    /// Last date (YYYY-MM-DD), inclusive
    #[arg(long)]
    end: NaiveDate,

    /// Upsert each day's EV into the history file
    #[arg(long)]
    persist: bool,

    /// Emit JSON instead of a text table
    #[arg(long)]
    json: bool,
}

fn parse_as_of(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("invalid --as-of '{}': expected RFC 3339 or YYYY-MM-DD", raw))?;
    end_of_day(date).map_err(Into::into)
}

fn build_resolver(config: &Config) -> Result<QuoteResolver<SnapshotStore>> {
    let snapshots = SnapshotStore::load(&config.data.snapshots_path)?;
    Ok(QuoteResolver::new(
        snapshots,
        config.market_registry(),
        config.alias_table(),
        config.vig_table(),
    )
    .with_policy(config.engine.selection_policy)
    .with_lookback(config.engine.lookback_rows))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Table(args) => {
            let resolver = build_resolver(&config)?;
            let ledger = LedgerBook::load(&config.data.ledger_path)?;
            let as_of = match args.as_of.as_deref() {
                Some(raw) => parse_as_of(raw)?,
                None => Utc::now(),
            };
            let result = evaluate_portfolio(&resolver, &ledger, &args.scope.scope(), as_of).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print!("{}", report::render_table(&result));
            }
        }
        Commands::Trend(args) => {
            let resolver = build_resolver(&config)?;
            let ledger = LedgerBook::load(&config.data.ledger_path)?;
            let points =
                compute_trend(&resolver, &ledger, &args.scope.scope(), args.start, args.end).await?;

            if args.persist {
                let mut history = EvHistory::open(&config.data.history_path)?;
                for p in &points {
                    history.upsert(p.date, p.total_expected_value);
                }
                history.save()?;
                tracing::info!(
                    days = points.len(),
                    path = %config.data.history_path.display(),
                    "EV history updated"
                );
            }

            if args.json {
                println!("{}", serde_json::to_string_pretty(&points)?);
            } else {
                print!("{}", report::render_trend(&points));
            }
        }
        Commands::Markets => {
            let registry = config.market_registry();
            let vig = config.vig_table();
            for (market, source) in registry.markets() {
                println!("{:<40} {:<28} vig {:.3}", market.to_string(), source, vig.vig_for(market));
            }
        }
    }

    Ok(())
}
