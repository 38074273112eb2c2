//! Daily EV trend and its persisted history.

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};
    use futures_ev::engine::markets::{AliasTable, MarketRegistry, VigTable};
    use futures_ev::engine::portfolio::compute_trend;
    use futures_ev::engine::QuoteResolver;
    use futures_ev::feed::ledger::LedgerBook;
    use futures_ev::feed::snapshots::SnapshotStore;
    use futures_ev::feed::types::{Leg, MarketKey, OddsSnapshotRow, RawQuote, Scope, Wager, WagerStatus};
    use futures_ev::history::EvHistory;
    use std::collections::BTreeMap;

    fn nba() -> MarketKey {
        MarketKey::new("Championship", "NBA Championship")
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn snapshot(d: u32, hour: u32, odds: i64) -> OddsSnapshotRow {
        OddsSnapshotRow {
            source: "nba_championship".into(),
            participant: "Celtics".into(),
            timestamp: Utc.with_ymd_and_hms(2025, 3, d, hour, 0, 0).unwrap(),
            quotes: BTreeMap::from([("draftkings".to_string(), RawQuote::Integer(odds))]),
        }
    }

    fn wager(id: &str, placed_day: u32) -> Wager {
        Wager {
            id: id.into(),
            portfolio: "main".into(),
            league: "NBA".into(),
            stake: 100.0,
            potential_payout: 300.0,
            status: WagerStatus::Active,
            net_profit: None,
            placed_at: Utc.with_ymd_and_hms(2025, 3, placed_day, 9, 0, 0).unwrap(),
            settled_at: None,
            legs: vec![Leg::new(nba(), "Celtics")],
        }
    }

    fn resolver() -> QuoteResolver<SnapshotStore> {
        QuoteResolver::new(
            SnapshotStore::from_rows(vec![snapshot(1, 8, 150), snapshot(3, 23, 100)]),
            MarketRegistry::new().with_market(nba(), "nba_championship"),
            AliasTable::default(),
            VigTable::default(),
        )
    }

    #[tokio::test]
    async fn test_trend_uses_only_data_up_to_each_day() {
        let ledger = LedgerBook::from_wagers(vec![wager("a", 1), wager("b", 2)]);
        let points = compute_trend(&resolver(), &ledger, &Scope::new("main", None), day(1), day(4))
            .await
            .unwrap();

        let dates: Vec<_> = points.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![day(1), day(2), day(3), day(4)]);

        // Day 1: one wager at +150 (fair 0.38): 300 * 0.38 - 100 = 14.
        assert!((points[0].total_expected_value - 14.0).abs() < 1e-9);
        // Day 2: second wager placed, same odds.
        assert!((points[1].total_expected_value - 28.0).abs() < 1e-9);
        // Day 3: 23:00 snapshot moves to +100 (fair 0.475): 2 * (142.5 - 100) = 85.
        assert!((points[2].total_expected_value - 85.0).abs() < 1e-9);
        assert_eq!(points[2].total_expected_value, points[3].total_expected_value);
        assert_eq!(points[3].counts.active_included, 2);
    }

    #[tokio::test]
    async fn test_trend_ignores_wagers_settled_since() {
        let mut won = wager("won", 1);
        won.status = WagerStatus::Win;
        won.net_profit = Some(200.0);
        won.settled_at = Some(Utc.with_ymd_and_hms(2025, 3, 3, 12, 0, 0).unwrap());

        let only_settled = LedgerBook::from_wagers(vec![won.clone()]);
        let points = compute_trend(&resolver(), &only_settled, &Scope::new("main", None), day(1), day(4))
            .await
            .unwrap();
        assert_eq!(points.len(), 4);
        for p in &points {
            assert_eq!(p.total_expected_value, 0.0);
            assert_eq!(p.counts.active_included, 0);
            assert_eq!(p.counts.settled_included, 0);
        }

        // Alongside a still-active wager the settled one changes nothing,
        // before or after its settlement date.
        let mixed = LedgerBook::from_wagers(vec![won, wager("open", 1)]);
        let points = compute_trend(&resolver(), &mixed, &Scope::new("main", None), day(1), day(2))
            .await
            .unwrap();
        for p in &points {
            assert!((p.total_expected_value - 14.0).abs() < 1e-9);
            assert_eq!(p.total.realized_net_profit, 0.0);
            assert_eq!(p.counts.active_included, 1);
        }
    }

    #[tokio::test]
    async fn test_trend_before_any_odds_is_zero() {
        let ledger = LedgerBook::from_wagers(vec![wager("a", 1)]);
        let resolver = QuoteResolver::new(
            SnapshotStore::from_rows(vec![snapshot(2, 8, 150)]),
            MarketRegistry::new().with_market(nba(), "nba_championship"),
            AliasTable::default(),
            VigTable::default(),
        );
        let points = compute_trend(&resolver, &ledger, &Scope::new("main", None), day(1), day(2))
            .await
            .unwrap();
        assert_eq!(points[0].total_expected_value, 0.0);
        assert_eq!(points[0].counts.unresolvable, 1);
        assert!((points[1].total_expected_value - 14.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_trend_rejects_inverted_range() {
        let ledger = LedgerBook::default();
        let err = compute_trend(&resolver(), &ledger, &Scope::new("main", None), day(5), day(1))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid trend range"));
    }

    #[tokio::test]
    async fn test_recomputed_trend_overwrites_history() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ev_history.json");
        let scope = Scope::new("main", None);

        let ledger = LedgerBook::from_wagers(vec![wager("a", 1)]);
        for _ in 0..2 {
            let points = compute_trend(&resolver(), &ledger, &scope, day(1), day(3)).await.unwrap();
            let mut history = EvHistory::open(&path).unwrap();
            for p in &points {
                history.upsert(p.date, p.total_expected_value);
            }
            history.save().unwrap();
        }

        let history = EvHistory::open(&path).unwrap();
        assert_eq!(history.len(), 3);
        assert!((history.get(day(3)).unwrap() - 42.5).abs() < 1e-9);
    }
}
