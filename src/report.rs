// Display rows for presentation layers (CLI table, JSON)

use crate::engine::portfolio::{PortfolioReport, Totals, TrendPoint};
use serde::Serialize;
use std::fmt;

pub const TOTAL_LABEL: &str = "TOTAL";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub event_type: String,
    pub event_label: String,
    pub stake: f64,
    pub expected_payout: f64,
    pub realized_profit: f64,
    pub expected_value: f64,
}

impl ReportRow {
    fn from_totals(event_type: &str, event_label: &str, totals: &Totals) -> Self {
        Self {
            event_type: event_type.to_string(),
            event_label: event_label.to_string(),
            stake: totals.active_stake,
            expected_payout: totals.active_expected_payout,
            realized_profit: totals.realized_net_profit,
            expected_value: totals.expected_value(),
        }
    }
}

/// One row per observed market followed by the TOTAL row.
pub fn build_report_rows(report: &PortfolioReport) -> Vec<ReportRow> {
    report
        .markets
        .iter()
        .map(|m| ReportRow::from_totals(&m.market.event_type, &m.market.event_label, &m.totals))
        .chain(std::iter::once(ReportRow::from_totals(TOTAL_LABEL, "", &report.total)))
        .collect()
}

/// Text table of market rows, the TOTAL row and allocation counts.
pub struct TableView<'a>(pub &'a PortfolioReport);

impl fmt::Display for TableView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        let rows = build_report_rows(report);
        let w = rows
            .iter()
            .map(|r| r.event_type.len() + r.event_label.len() + 3)
            .max()
            .unwrap_or(0)
            .max("Market".len());

        writeln!(
            f,
            "{:<w$}  {:>12}  {:>12}  {:>12}  {:>12}",
            "Market", "Stake", "Exp. Payout", "Realized", "EV"
        )?;
        writeln!(f, "{}", "-".repeat(w + 4 * 14))?;
        for row in &rows {
            let label = if row.event_label.is_empty() {
                row.event_type.clone()
            } else {
                format!("{} / {}", row.event_type, row.event_label)
            };
            writeln!(
                f,
                "{:<w$}  {:>12.2}  {:>12.2}  {:>12.2}  {:>+12.2}",
                label, row.stake, row.expected_payout, row.realized_profit, row.expected_value
            )?;
        }

        let c = &report.counts;
        writeln!(
            f,
            "\nas of {} | active {} | settled {} | unresolvable {} | degenerate {}",
            report.as_of.format("%Y-%m-%d %H:%M UTC"),
            c.active_included,
            c.settled_included,
            c.unresolvable,
            c.degenerate
        )
    }
}

pub struct TrendView<'a>(pub &'a [TrendPoint]);

impl fmt::Display for TrendView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<10}  {:>12}  {:>12}  {:>12}", "Date", "Stake", "Exp. Payout", "EV")?;
        for p in self.0 {
            writeln!(
                f,
                "{:<10}  {:>12.2}  {:>12.2}  {:>+12.2}",
                p.date.format("%Y-%m-%d"),
                p.total.active_stake,
                p.total.active_expected_payout,
                p.total_expected_value
            )?;
        }
        Ok(())
    }
}

pub fn render_table(report: &PortfolioReport) -> String {
    TableView(report).to_string()
}

pub fn render_trend(points: &[TrendPoint]) -> String {
    TrendView(points).to_string()
}
