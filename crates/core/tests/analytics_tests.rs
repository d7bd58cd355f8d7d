// ═══════════════════════════════════════════════════════════════════
// Analytics Tests — risk metrics, rankings, drift, roll-ups
// ═══════════════════════════════════════════════════════════════════

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;

use portfolio_ledger_core::models::analytics::DriftStatus;
use portfolio_ledger_core::models::holdings::FxRates;
use portfolio_ledger_core::models::prices::PricePoint;
use portfolio_ledger_core::models::trade::{TradeEvent, TradeKind};
use portfolio_ledger_core::models::valuation::ValuationTable;
use portfolio_ledger_core::services::analytics_service::AnalyticsService;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// Valuation table with consecutive daily dates and the given columns;
/// `total` is the row-wise sum and `invested` a flat zero line.
fn table(start: NaiveDate, columns: &[(&str, &[f64])]) -> ValuationTable {
    let len = columns[0].1.len();
    let dates: Vec<NaiveDate> = (0..len)
        .map(|i| start + chrono::Duration::days(i as i64))
        .collect();
    let columns: BTreeMap<String, Vec<f64>> = columns
        .iter()
        .map(|(s, vals)| (s.to_string(), vals.to_vec()))
        .collect();
    let total: Vec<f64> = (0..len)
        .map(|i| columns.values().map(|col| col[i]).sum())
        .collect();
    ValuationTable {
        dates,
        columns,
        total,
        invested: vec![0.0; len],
    }
}

// ── Daily change ────────────────────────────────────────────────────

#[test]
fn daily_change_compares_the_last_two_rows() {
    let t = table(d(2024, 1, 1), &[("A", &[100_000.0, 110_000.0, 99_000.0])]);
    let change = AnalyticsService::new().daily_change(&t);

    assert!((change.change_jpy - (-11_000.0)).abs() < 1e-6);
    assert!((change.change_pct - (-10.0)).abs() < 1e-6);
}

#[test]
fn daily_change_is_zero_for_short_histories() {
    let t = table(d(2024, 1, 1), &[("A", &[100_000.0])]);
    let change = AnalyticsService::new().daily_change(&t);
    assert_eq!(change.change_jpy, 0.0);
    assert_eq!(change.change_pct, 0.0);
}

// ── Risk metrics ────────────────────────────────────────────────────

#[test]
fn risk_metrics_on_a_monotone_series() {
    let t = table(d(2024, 1, 1), &[("A", &[100.0, 101.0, 102.0, 103.0, 104.0])]);
    let m = AnalyticsService::new().risk_metrics(&t);

    assert!(m.annual_return_pct > 0.0);
    assert!(m.annual_volatility_pct > 0.0);
    assert!(m.sharpe_ratio > 0.0);
    // Never declined, so no drawdown and no Calmar denominator
    assert_eq!(m.max_drawdown_pct, 0.0);
    assert_eq!(m.calmar_ratio, 0.0);
}

#[test]
fn max_drawdown_measures_peak_to_trough() {
    let t = table(d(2024, 1, 1), &[("A", &[100.0, 120.0, 90.0, 110.0])]);
    let m = AnalyticsService::new().risk_metrics(&t);

    // Peak 120 → trough 90 = −25%
    assert!((m.max_drawdown_pct - (-25.0)).abs() < 1e-6);
    assert!(m.calmar_ratio != 0.0);
}

#[test]
fn risk_metrics_default_on_degenerate_input() {
    let service = AnalyticsService::new();
    assert_eq!(
        service.risk_metrics(&ValuationTable::new()),
        Default::default()
    );

    // Flat series: zero volatility, zero Sharpe
    let t = table(d(2024, 1, 1), &[("A", &[100.0, 100.0, 100.0])]);
    let m = service.risk_metrics(&t);
    assert_eq!(m.sharpe_ratio, 0.0);
    assert_eq!(m.annual_volatility_pct, 0.0);
}

#[test]
fn drawdown_series_tracks_the_running_peak() {
    let t = table(d(2024, 1, 1), &[("A", &[100.0, 120.0, 90.0, 110.0])]);
    let dd = AnalyticsService::new().drawdown_series(&t);

    assert_eq!(dd.len(), 4);
    assert_eq!(dd[0].value, 0.0);
    assert_eq!(dd[1].value, 0.0);
    assert!((dd[2].value - (-25.0)).abs() < 1e-6);
    assert!((dd[3].value - (110.0 / 120.0 - 1.0) * 100.0).abs() < 1e-6);
}

// ── Rolling Sharpe ──────────────────────────────────────────────────

#[test]
fn rolling_sharpe_needs_window_plus_one_rows() {
    let service = AnalyticsService::new();
    let t = table(d(2024, 1, 1), &[("A", &[100.0, 101.0, 102.0])]);

    assert!(service.rolling_sharpe(&t, 3).is_empty());

    let points = service.rolling_sharpe(&t, 2);
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].date, d(2024, 1, 3));
}

#[test]
fn rolling_sharpe_skips_zero_volatility_windows() {
    let t = table(d(2024, 1, 1), &[("A", &[100.0, 100.0, 100.0, 100.0, 105.0])]);
    let points = AnalyticsService::new().rolling_sharpe(&t, 2);

    // Only the final window (flat return then +5%) has nonzero stdev
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].date, d(2024, 1, 5));
}

// ── Top / worst performers ──────────────────────────────────────────

#[test]
fn performers_are_ranked_by_daily_percentage_move() {
    let t = table(
        d(2024, 1, 1),
        &[
            ("A", &[100.0, 110.0][..]), // +10%
            ("B", &[100.0, 95.0][..]),  // −5%
            ("C", &[100.0, 102.0][..]), // +2%
        ],
    );
    let ranked = AnalyticsService::new().top_worst_performers(&t, 2);

    assert_eq!(ranked.top[0].symbol, "A");
    assert_eq!(ranked.top[1].symbol, "C");
    assert_eq!(ranked.worst[0].symbol, "B");
    assert!((ranked.top[0].change_pct - 10.0).abs() < 1e-6);
    assert!((ranked.worst[0].change_jpy - (-5.0)).abs() < 1e-6);
}

#[test]
fn performers_ignore_symbols_entering_or_leaving() {
    let t = table(
        d(2024, 1, 1),
        &[
            ("A", &[100.0, 110.0][..]),
            ("NEW", &[0.0, 50.0][..]), // first day held: no prior value
            ("GONE", &[50.0, 0.0][..]),
        ],
    );
    let ranked = AnalyticsService::new().top_worst_performers(&t, 3);

    let symbols: Vec<&str> = ranked.top.iter().map(|p| p.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["A"]);
}

// ── Benchmark ───────────────────────────────────────────────────────

#[test]
fn benchmark_is_normalized_to_the_portfolio_start() {
    let t = table(d(2024, 1, 1), &[("A", &[200_000.0, 210_000.0, 220_000.0])]);
    let bench = vec![
        PricePoint { date: d(2023, 12, 29), price: 90.0 }, // before the window
        PricePoint { date: d(2024, 1, 1), price: 100.0 },
        PricePoint { date: d(2024, 1, 2), price: 105.0 },
        PricePoint { date: d(2024, 1, 3), price: 110.0 },
    ];
    let service = AnalyticsService::new();
    let normalized = service.normalize_benchmark(&t, &bench);

    assert_eq!(normalized.len(), 3);
    assert!((normalized[0].value - 200_000.0).abs() < 1e-6);
    assert!((normalized[2].value - 220_000.0).abs() < 1e-6);

    let excess = service.benchmark_excess(&t, &normalized).unwrap();
    assert!((excess.portfolio_return_pct - 10.0).abs() < 1e-6);
    assert!((excess.benchmark_return_pct - 10.0).abs() < 1e-6);
    assert!(excess.excess_return_pct.abs() < 1e-6);
}

// ── Correlation ─────────────────────────────────────────────────────

#[test]
fn perfectly_parallel_columns_correlate_at_one() {
    let a: Vec<f64> = (0..30).map(|i| 100.0 + i as f64 * (-1.0_f64).powi(i) ).collect();
    let b: Vec<f64> = a.iter().map(|v| v * 2.0).collect();
    let t = table(d(2024, 1, 1), &[("A", &a), ("B", &b)]);

    let matrix = AnalyticsService::new().correlation_matrix(&t, 20);
    assert_eq!(matrix.symbols, vec!["A", "B"]);
    assert!((matrix.get("A", "B").unwrap() - 1.0).abs() < 1e-9);
    assert!((matrix.get("A", "A").unwrap() - 1.0).abs() < 1e-9);
}

#[test]
fn correlation_is_empty_below_the_observation_floor() {
    let t = table(d(2024, 1, 1), &[("A", &[1.0, 2.0][..]), ("B", &[2.0, 3.0][..])]);
    assert!(AnalyticsService::new().correlation_matrix(&t, 20).is_empty());

    let single = table(d(2024, 1, 1), &[("A", &[1.0; 30])]);
    assert!(AnalyticsService::new().correlation_matrix(&single, 20).is_empty());
}

// ── Weight drift ────────────────────────────────────────────────────

#[test]
fn equal_weight_default_flags_both_sides_of_a_60_40_split() {
    let t = table(d(2024, 1, 1), &[("A", &[600_000.0][..]), ("B", &[400_000.0][..])]);
    let alerts = AnalyticsService::new().weight_drift(&t, None, 5.0);

    assert_eq!(alerts.len(), 2);
    let a = alerts.iter().find(|al| al.symbol == "A").unwrap();
    let b = alerts.iter().find(|al| al.symbol == "B").unwrap();
    assert!((a.drift_pct - 10.0).abs() < 1e-6);
    assert_eq!(a.status, DriftStatus::Overweight);
    assert!((b.drift_pct - (-10.0)).abs() < 1e-6);
    assert_eq!(b.status, DriftStatus::Underweight);
}

#[test]
fn explicit_targets_override_equal_weight() {
    let t = table(d(2024, 1, 1), &[("A", &[600_000.0][..]), ("B", &[400_000.0][..])]);
    let targets: HashMap<String, f64> = [("A".to_string(), 60.0), ("B".to_string(), 40.0)]
        .into_iter()
        .collect();

    let alerts = AnalyticsService::new().weight_drift(&t, Some(&targets), 5.0);
    assert!(alerts.is_empty());
}

#[test]
fn drift_ignores_positions_not_currently_held() {
    let t = table(
        d(2024, 1, 1),
        &[("A", &[500_000.0, 600_000.0][..]), ("SOLD", &[500_000.0, 0.0][..])],
    );
    let alerts = AnalyticsService::new().weight_drift(&t, None, 5.0);

    // Only A is held on the last day; it is exactly at its 100% equal
    // weight, so nothing drifts
    assert!(alerts.is_empty());
}

// ── Monthly roll-ups ────────────────────────────────────────────────

#[test]
fn monthly_summary_takes_month_end_rows() {
    let mut t = table(
        d(2024, 1, 30),
        &[("A", &[100_000.0, 110_000.0, 120_000.0, 121_000.0][..])],
    );
    // Dates: Jan 30, Jan 31, Feb 1, Feb 2
    t.invested = vec![100_000.0; 4];
    let rows = AnalyticsService::new().monthly_summary(&t);

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].month, "2024-01");
    assert_eq!(rows[0].month_end_value_jpy, 110_000.0);
    assert_eq!(rows[0].change_pct, None); // no prior month
    assert_eq!(rows[1].month, "2024-02");
    assert_eq!(rows[1].month_end_value_jpy, 121_000.0);
    assert!((rows[1].change_pct.unwrap() - 10.0).abs() < 1e-6);
    assert!((rows[1].unrealized_pnl_jpy - 21_000.0).abs() < 1e-6);
}

#[test]
fn trade_activity_aggregates_by_month() {
    let events = vec![
        TradeEvent::new("A", d(2024, 1, 5), TradeKind::Buy, 10.0, 1000.0, "JPY"),
        TradeEvent::new("A", d(2024, 1, 20), TradeKind::Buy, 5.0, 1100.0, "JPY"),
        TradeEvent::new("A", d(2024, 2, 3), TradeKind::Sell, 8.0, 1200.0, "JPY"),
    ];
    let rows = AnalyticsService::new().trade_activity(&events, &FxRates::default());

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].month, "2024-01");
    assert_eq!(rows[0].buy_count, 2);
    assert!((rows[0].buy_amount_jpy - 15_500.0).abs() < 1e-6);
    assert!((rows[0].net_flow_jpy - 15_500.0).abs() < 1e-6);
    assert_eq!(rows[1].month, "2024-02");
    assert_eq!(rows[1].sell_count, 1);
    assert!((rows[1].net_flow_jpy - (-9600.0)).abs() < 1e-6);
}
