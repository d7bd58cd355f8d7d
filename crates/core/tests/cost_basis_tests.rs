// ═══════════════════════════════════════════════════════════════════
// Cost Basis Tests — FIFO lots, settlement resolution, splits
// ═══════════════════════════════════════════════════════════════════

use std::collections::HashMap;

use chrono::NaiveDate;

use portfolio_ledger_core::models::holdings::FxRates;
use portfolio_ledger_core::models::trade::{TradeEvent, TradeKind};
use portfolio_ledger_core::services::cost_basis_service::CostBasisService;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn jpy_trade(
    symbol: &str,
    date: NaiveDate,
    kind: TradeKind,
    shares: f64,
    price: f64,
) -> TradeEvent {
    let mut e = TradeEvent::new(symbol, date, kind, shares, price, "JPY");
    e.settlement_jpy = Some(shares * price);
    e
}

fn fx(pairs: &[(&str, f64)]) -> FxRates {
    FxRates::new(
        pairs
            .iter()
            .map(|(c, r)| (c.to_string(), *r))
            .collect::<HashMap<_, _>>(),
    )
}

#[test]
fn single_round_trip_realizes_the_spread() {
    let events = vec![
        jpy_trade("7203.T", d(2024, 1, 10), TradeKind::Buy, 100.0, 2800.0),
        jpy_trade("7203.T", d(2024, 2, 10), TradeKind::Sell, 100.0, 3000.0),
    ];
    let pnl = CostBasisService::new().realized_pnl(&events, &FxRates::default());

    assert!((pnl.for_symbol("7203.T") - 20_000.0).abs() < 1e-6);
    assert!((pnl.total_jpy - 20_000.0).abs() < 1e-6);
    assert!(pnl.unmatched_shares.is_empty());
}

#[test]
fn partial_sell_consumes_lots_oldest_first() {
    // 30 @ 100, then 70 @ 200; selling 50 @ 180 takes all of the first lot
    // and 20 shares of the second: 30×80 − 20×20 = 2000
    let events = vec![
        jpy_trade("A", d(2024, 1, 1), TradeKind::Buy, 30.0, 100.0),
        jpy_trade("A", d(2024, 1, 2), TradeKind::Buy, 70.0, 200.0),
        jpy_trade("A", d(2024, 1, 3), TradeKind::Sell, 50.0, 180.0),
    ];
    let pnl = CostBasisService::new().realized_pnl(&events, &FxRates::default());

    assert!((pnl.for_symbol("A") - 2000.0).abs() < 1e-6);
}

#[test]
fn split_rescales_lots_and_conserves_cost_basis() {
    // 34 shares bought for 1,080,000 JPY, then a 6-for-1 split delivered as
    // a zero-price transfer of 170 extra shares (34 → 204). Selling all 204
    // for 2,295,000 realizes 2,295,000 − 1,080,000.
    let mut buy = TradeEvent::new("285A.T", d(2024, 1, 10), TradeKind::Buy, 34.0, 31_764.7, "JPY");
    buy.settlement_jpy = Some(1_080_000.0);
    let split = TradeEvent::new("285A.T", d(2024, 6, 1), TradeKind::Transfer, 170.0, 0.0, "JPY");
    let mut sell = TradeEvent::new("285A.T", d(2024, 9, 1), TradeKind::Sell, 204.0, 11_250.0, "JPY");
    sell.settlement_jpy = Some(2_295_000.0);

    let pnl = CostBasisService::new().realized_pnl(&[buy, split, sell], &FxRates::default());

    assert!((pnl.for_symbol("285A.T") - 1_215_000.0).abs() < 1e-6);
}

#[test]
fn split_with_no_open_lots_is_a_no_op() {
    let split = TradeEvent::new("A", d(2024, 1, 1), TradeKind::Transfer, 100.0, 0.0, "JPY");
    let pnl = CostBasisService::new().realized_pnl(&[split], &FxRates::default());

    assert!(pnl.by_symbol.is_empty());
    assert_eq!(pnl.total_jpy, 0.0);
}

#[test]
fn transfer_with_price_opens_a_lot() {
    let events = vec![
        jpy_trade("A", d(2024, 1, 1), TradeKind::Transfer, 10.0, 500.0),
        jpy_trade("A", d(2024, 2, 1), TradeKind::Sell, 10.0, 600.0),
    ];
    let pnl = CostBasisService::new().realized_pnl(&events, &FxRates::default());

    assert!((pnl.for_symbol("A") - 1000.0).abs() < 1e-6);
}

// ── Settlement resolution chain ─────────────────────────────────────

#[test]
fn combined_settlement_takes_priority() {
    let service = CostBasisService::new();
    let mut e = TradeEvent::new("AAPL", d(2024, 1, 1), TradeKind::Buy, 10.0, 185.0, "USD");
    e.settlement_jpy = Some(100_000.0);
    e.settlement_foreign = Some(1000.0);
    e.fx_rate = Some(150.0);

    let jpy = service.resolve_trade_jpy(&e, &FxRates::default());
    assert!((jpy - 250_000.0).abs() < 1e-6); // 100,000 + 1000 × 150
}

#[test]
fn jpy_settlement_alone_wins_over_notional() {
    let service = CostBasisService::new();
    let mut e = TradeEvent::new("AAPL", d(2024, 1, 1), TradeKind::Buy, 10.0, 185.0, "USD");
    e.settlement_jpy = Some(280_000.0);
    e.fx_rate = Some(150.0);

    assert!((service.resolve_trade_jpy(&e, &FxRates::default()) - 280_000.0).abs() < 1e-6);
}

#[test]
fn foreign_settlement_converts_at_trade_time_rate() {
    let service = CostBasisService::new();
    let mut e = TradeEvent::new("AAPL", d(2024, 1, 1), TradeKind::Buy, 10.0, 185.0, "USD");
    e.settlement_foreign = Some(1850.0);
    e.fx_rate = Some(151.0);

    assert!((service.resolve_trade_jpy(&e, &FxRates::default()) - 279_350.0).abs() < 1e-6);
}

#[test]
fn trade_time_notional_uses_recorded_rate() {
    let service = CostBasisService::new();
    let mut e = TradeEvent::new("AAPL", d(2024, 1, 1), TradeKind::Buy, 10.0, 185.0, "USD");
    e.fx_rate = Some(150.0);

    // 10 × 185 × 150
    assert!((service.resolve_trade_jpy(&e, &FxRates::default()) - 277_500.0).abs() < 1e-6);
}

#[test]
fn legacy_records_fall_back_to_current_fx() {
    let service = CostBasisService::new();
    let e = TradeEvent::new("AAPL", d(2024, 1, 1), TradeKind::Buy, 10.0, 185.0, "USD");
    let rates = fx(&[("USD", 148.0)]);

    assert!((service.resolve_trade_jpy(&e, &rates) - 273_800.0).abs() < 1e-6);
}

#[test]
fn unknown_currency_converts_at_identity() {
    let service = CostBasisService::new();
    let e = TradeEvent::new("X", d(2024, 1, 1), TradeKind::Buy, 10.0, 185.0, "CHF");

    assert!((service.resolve_trade_jpy(&e, &FxRates::default()) - 1850.0).abs() < 1e-6);
}

// ── Edge cases ──────────────────────────────────────────────────────

#[test]
fn cash_markers_never_enter_cost_basis() {
    let events = vec![
        jpy_trade("JPY.CASH", d(2024, 1, 1), TradeKind::Buy, 1_000_000.0, 1.0),
        jpy_trade("JPY.CASH", d(2024, 2, 1), TradeKind::Sell, 1_000_000.0, 1.0),
    ];
    let pnl = CostBasisService::new().realized_pnl(&events, &FxRates::default());

    assert!(pnl.by_symbol.is_empty());
}

#[test]
fn over_sell_clamps_and_reports_unmatched_shares() {
    let events = vec![
        jpy_trade("A", d(2024, 1, 1), TradeKind::Buy, 50.0, 100.0),
        jpy_trade("A", d(2024, 2, 1), TradeKind::Sell, 80.0, 120.0),
    ];
    let pnl = CostBasisService::new().realized_pnl(&events, &FxRates::default());

    // Only the 50 matched shares contribute: 50 × 20
    assert!((pnl.for_symbol("A") - 1000.0).abs() < 1e-6);
    assert!((pnl.unmatched_shares["A"] - 30.0).abs() < 1e-6);
}

#[test]
fn replay_is_idempotent() {
    let events = vec![
        jpy_trade("A", d(2024, 1, 1), TradeKind::Buy, 30.0, 100.0),
        jpy_trade("A", d(2024, 1, 2), TradeKind::Buy, 70.0, 200.0),
        jpy_trade("A", d(2024, 1, 3), TradeKind::Sell, 50.0, 180.0),
    ];
    let service = CostBasisService::new();

    let first = service.realized_pnl(&events, &FxRates::default());
    let second = service.realized_pnl(&events, &FxRates::default());
    assert_eq!(first, second);
}
