pub mod allocator;
pub mod markets;
pub mod odds;
pub mod portfolio;
pub mod resolver;

pub use allocator::{allocate_wager, Allocation, ExclusionReason, LegAllocation, WagerAllocation};
pub use markets::{AliasTable, MarketRegistry, VigTable};
pub use portfolio::{compute_trend, evaluate_portfolio, evaluate_wagers, MarketAggregate, PortfolioReport, TrendPoint};
pub use resolver::{Price, QuoteBook, QuoteResolver, ResolvedQuote, SelectionPolicy};
