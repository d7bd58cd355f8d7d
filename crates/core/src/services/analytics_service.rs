use std::collections::{BTreeMap, HashMap};

use crate::models::analytics::{
    BenchmarkExcess, CorrelationMatrix, DailyChange, DriftStatus, MonthlySummaryRow, Performer,
    RiskMetrics, SeriesPoint, TopWorstPerformers, TradeActivityRow, WeightDriftAlert,
};
use crate::models::holdings::FxRates;
use crate::models::prices::PricePoint;
use crate::models::trade::{TradeEvent, TradeKind};
use crate::models::valuation::ValuationTable;

/// Trading days per year used for annualization.
const TRADING_DAYS: f64 = 252.0;

/// Fixed annual risk-free rate assumption (0.5%).
const RISK_FREE_RATE: f64 = 0.005;

/// Average calendar days per year, for compounding over elapsed days.
const DAYS_PER_YEAR: f64 = 365.25;

/// Default sliding window for the rolling Sharpe series (trading rows).
pub const DEFAULT_ROLLING_WINDOW: usize = 60;

/// Default number of entries on each side of the top/worst ranking.
pub const DEFAULT_TOP_N: usize = 3;

/// Minimum paired observations for a correlation cell.
pub const DEFAULT_MIN_CORRELATION_PERIODS: usize = 20;

/// Default weight-drift alert threshold, in percentage points.
pub const DEFAULT_DRIFT_THRESHOLD_PCT: f64 = 5.0;

/// Derived statistics over the valuation table.
///
/// Every function is pure and total: degenerate input (empty table, too few
/// rows, zero volatility) yields a zero/empty result instead of an error, so
/// a rendering layer never crashes on a new or thinly-traded portfolio.
pub struct AnalyticsService;

impl AnalyticsService {
    pub fn new() -> Self {
        Self
    }

    // ── Daily change ────────────────────────────────────────────────

    /// Latest day-over-day move of the total valuation.
    pub fn daily_change(&self, table: &ValuationTable) -> DailyChange {
        if table.len() < 2 {
            return DailyChange::default();
        }
        let latest = table.total[table.len() - 1];
        let previous = table.total[table.len() - 2];
        let change = latest - previous;
        let pct = if previous != 0.0 {
            change / previous * 100.0
        } else {
            0.0
        };
        DailyChange {
            change_jpy: change,
            change_pct: pct,
        }
    }

    // ── Risk metrics ────────────────────────────────────────────────

    /// Annualized return, volatility, Sharpe, max drawdown, and Calmar over
    /// the total valuation series.
    ///
    /// The annual return compounds over actual elapsed calendar days rather
    /// than row count, so gaps in the series don't distort it.
    pub fn risk_metrics(&self, table: &ValuationTable) -> RiskMetrics {
        if table.len() < 2 {
            return RiskMetrics::default();
        }
        let total = &table.total;
        let returns = daily_returns(total);
        if returns.is_empty() || total[0] == 0.0 {
            return RiskMetrics::default();
        }

        let elapsed_days = (table.dates[table.len() - 1] - table.dates[0])
            .num_days()
            .max(1) as f64;
        let total_return = total[total.len() - 1] / total[0] - 1.0;
        let annual_return = (1.0 + total_return).powf(DAYS_PER_YEAR / elapsed_days) - 1.0;

        let annual_vol = sample_stdev(&returns) * TRADING_DAYS.sqrt();

        let sharpe = if annual_vol > 0.0 {
            (annual_return - RISK_FREE_RATE) / annual_vol
        } else {
            0.0
        };

        let max_dd = drawdowns(total).into_iter().fold(0.0_f64, f64::min);

        let calmar = if max_dd != 0.0 {
            annual_return / max_dd.abs()
        } else {
            0.0
        };

        RiskMetrics {
            sharpe_ratio: sharpe,
            max_drawdown_pct: max_dd * 100.0,
            annual_volatility_pct: annual_vol * 100.0,
            annual_return_pct: annual_return * 100.0,
            calmar_ratio: calmar,
        }
    }

    /// Full running drawdown series: (value − running peak) / peak, in
    /// percent (≤ 0). Empty under 2 rows.
    pub fn drawdown_series(&self, table: &ValuationTable) -> Vec<SeriesPoint> {
        if table.len() < 2 {
            return Vec::new();
        }
        drawdowns(&table.total)
            .into_iter()
            .zip(table.dates.iter())
            .map(|(dd, date)| SeriesPoint {
                date: *date,
                value: dd * 100.0,
            })
            .collect()
    }

    /// Annualized Sharpe ratio over a sliding window of daily returns.
    /// Empty when the history is shorter than `window + 1` rows; windows
    /// with zero volatility are skipped.
    pub fn rolling_sharpe(&self, table: &ValuationTable, window: usize) -> Vec<SeriesPoint> {
        if window == 0 || table.len() < window + 1 {
            return Vec::new();
        }
        let returns = daily_returns(&table.total);
        let daily_rf = (1.0 + RISK_FREE_RATE).powf(1.0 / TRADING_DAYS) - 1.0;

        let mut out = Vec::new();
        // returns[i] covers the move into dates[i + 1]
        for end in window..=returns.len() {
            let slice = &returns[end - window..end];
            let mean = slice.iter().sum::<f64>() / window as f64;
            let std = sample_stdev(slice);
            if std > 0.0 {
                out.push(SeriesPoint {
                    date: table.dates[end],
                    value: (mean - daily_rf) / std * TRADING_DAYS.sqrt(),
                });
            }
        }
        out
    }

    // ── Performers ──────────────────────────────────────────────────

    /// Single-day percentage change per symbol, ranked both ways.
    /// Only symbols with a positive value on both the latest and the prior
    /// day participate, so newly-added zero columns can't produce spurious
    /// infinite percentages.
    pub fn top_worst_performers(
        &self,
        table: &ValuationTable,
        top_n: usize,
    ) -> TopWorstPerformers {
        if table.len() < 2 {
            return TopWorstPerformers::default();
        }
        let last = table.len() - 1;

        let mut performers: Vec<Performer> = table
            .columns
            .iter()
            .filter_map(|(symbol, col)| {
                let cur = col[last];
                let prev = col[last - 1];
                if prev > 0.0 && cur > 0.0 {
                    Some(Performer {
                        symbol: symbol.clone(),
                        change_pct: (cur / prev - 1.0) * 100.0,
                        change_jpy: cur - prev,
                    })
                } else {
                    None
                }
            })
            .collect();

        performers.sort_by(|a, b| {
            b.change_pct
                .partial_cmp(&a.change_pct)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let n = top_n.min(performers.len());
        let top = performers[..n].to_vec();
        let mut worst = performers[performers.len() - n..].to_vec();
        worst.reverse();
        TopWorstPerformers { top, worst }
    }

    // ── Benchmark ───────────────────────────────────────────────────

    /// Rescale a benchmark close series onto the portfolio's own scale:
    /// both series start at the portfolio's first total valuation, so the
    /// comparison is of relative performance, never raw units.
    pub fn normalize_benchmark(
        &self,
        table: &ValuationTable,
        benchmark: &[PricePoint],
    ) -> Vec<SeriesPoint> {
        if table.is_empty() {
            return Vec::new();
        }
        let pf_start_date = table.dates[0];
        let pf_start_value = table.total[0];

        let mut points: Vec<&PricePoint> = benchmark
            .iter()
            .filter(|p| p.date >= pf_start_date)
            .collect();
        points.sort_by_key(|p| p.date);

        let first = match points.first() {
            Some(p) if p.price != 0.0 => p.price,
            _ => return Vec::new(),
        };

        points
            .into_iter()
            .map(|p| SeriesPoint {
                date: p.date,
                value: p.price / first * pf_start_value,
            })
            .collect()
    }

    /// Cumulative return of the portfolio versus a normalized benchmark
    /// over the common range. `None` when either series is too short.
    pub fn benchmark_excess(
        &self,
        table: &ValuationTable,
        benchmark: &[SeriesPoint],
    ) -> Option<BenchmarkExcess> {
        if table.len() < 2 || benchmark.len() < 2 {
            return None;
        }
        let first_total = table.total[0];
        let first_bench = benchmark[0].value;
        if first_total == 0.0 || first_bench == 0.0 {
            return None;
        }
        let pf = (table.total[table.len() - 1] / first_total - 1.0) * 100.0;
        let bm = (benchmark[benchmark.len() - 1].value / first_bench - 1.0) * 100.0;
        Some(BenchmarkExcess {
            portfolio_return_pct: pf,
            benchmark_return_pct: bm,
            excess_return_pct: pf - bm,
        })
    }

    // ── Correlation ─────────────────────────────────────────────────

    /// Pairwise Pearson correlation of daily returns across symbol columns
    /// (`total`/`invested` excluded by construction). Empty when fewer than
    /// two symbols or fewer than `min_periods` rows; individual cells with
    /// too few overlapping observations are NaN.
    pub fn correlation_matrix(
        &self,
        table: &ValuationTable,
        min_periods: usize,
    ) -> CorrelationMatrix {
        let symbols: Vec<String> = table.columns.keys().cloned().collect();
        if symbols.len() < 2 || table.len() < min_periods {
            return CorrelationMatrix::default();
        }

        // A return observation needs a positive previous value; days
        // without one (symbol not yet held) count as missing
        let returns: Vec<Vec<Option<f64>>> = symbols
            .iter()
            .map(|s| optional_returns(&table.columns[s]))
            .collect();

        let n = symbols.len();
        let mut values = vec![vec![f64::NAN; n]; n];
        for i in 0..n {
            for j in i..n {
                let corr = pearson(&returns[i], &returns[j], min_periods).unwrap_or(f64::NAN);
                values[i][j] = corr;
                values[j][i] = corr;
            }
        }

        CorrelationMatrix { symbols, values }
    }

    // ── Weight drift ────────────────────────────────────────────────

    /// Compare each currently-held position's share of total valuation
    /// against a target allocation (equal weight when no target is given)
    /// and return the positions drifting beyond `threshold_pct`, largest
    /// deviation first. Cash never enters the valuation table, so the
    /// denominator is already cash-free.
    pub fn weight_drift(
        &self,
        table: &ValuationTable,
        target_weights: Option<&HashMap<String, f64>>,
        threshold_pct: f64,
    ) -> Vec<WeightDriftAlert> {
        if table.is_empty() {
            return Vec::new();
        }
        let last = table.len() - 1;
        let total = table.total[last];
        if total <= 0.0 {
            return Vec::new();
        }

        let held: Vec<(&String, f64)> = table
            .columns
            .iter()
            .filter_map(|(s, col)| (col[last] > 0.0).then_some((s, col[last])))
            .collect();
        if held.is_empty() {
            return Vec::new();
        }
        let equal_weight = 100.0 / held.len() as f64;

        let mut alerts: Vec<WeightDriftAlert> = held
            .into_iter()
            .filter_map(|(symbol, value)| {
                let current_pct = value / total * 100.0;
                let target_pct = target_weights
                    .and_then(|t| t.get(symbol).copied())
                    .unwrap_or(equal_weight);
                let drift = current_pct - target_pct;
                (drift.abs() >= threshold_pct).then(|| WeightDriftAlert {
                    symbol: symbol.clone(),
                    current_pct,
                    target_pct,
                    drift_pct: drift,
                    status: if drift > 0.0 {
                        DriftStatus::Overweight
                    } else {
                        DriftStatus::Underweight
                    },
                })
            })
            .collect();

        alerts.sort_by(|a, b| {
            b.drift_pct
                .abs()
                .partial_cmp(&a.drift_pct.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        alerts
    }

    // ── Monthly roll-ups ────────────────────────────────────────────

    /// Month-end totals with month-over-month and year-over-year change and
    /// unrealized P&L (month-end value minus invested capital).
    pub fn monthly_summary(&self, table: &ValuationTable) -> Vec<MonthlySummaryRow> {
        if table.is_empty() {
            return Vec::new();
        }

        // Last row of each calendar month
        let mut month_end: BTreeMap<String, (f64, f64)> = BTreeMap::new();
        for (i, date) in table.dates.iter().enumerate() {
            month_end.insert(
                date.format("%Y-%m").to_string(),
                (table.total[i], table.invested[i]),
            );
        }

        let months: Vec<(String, (f64, f64))> = month_end.into_iter().collect();
        months
            .iter()
            .enumerate()
            .map(|(i, (month, (value, invested)))| {
                let change_pct = (i >= 1).then(|| months[i - 1].1 .0).and_then(|prev| {
                    (prev != 0.0).then(|| (value / prev - 1.0) * 100.0)
                });
                let yoy_pct = (i >= 12).then(|| months[i - 12].1 .0).and_then(|prev| {
                    (prev != 0.0).then(|| (value / prev - 1.0) * 100.0)
                });
                MonthlySummaryRow {
                    month: month.clone(),
                    month_end_value_jpy: *value,
                    invested_jpy: *invested,
                    change_pct,
                    yoy_pct,
                    unrealized_pnl_jpy: value - invested,
                }
            })
            .collect()
    }

    /// Per-month buy/sell counts, notional amounts, and net flow from the
    /// ledger, valued at shares × price × current FX.
    pub fn trade_activity(
        &self,
        events: &[TradeEvent],
        fx_rates: &FxRates,
    ) -> Vec<TradeActivityRow> {
        let mut months: BTreeMap<String, TradeActivityRow> = BTreeMap::new();

        for event in events {
            let month = event.date.format("%Y-%m").to_string();
            let amount = event.shares * event.price * fx_rates.rate(&event.currency);
            let row = months.entry(month.clone()).or_insert_with(|| TradeActivityRow {
                month,
                ..TradeActivityRow::default()
            });
            match event.kind {
                TradeKind::Buy | TradeKind::Transfer => {
                    row.buy_count += 1;
                    row.buy_amount_jpy += amount;
                }
                TradeKind::Sell => {
                    row.sell_count += 1;
                    row.sell_amount_jpy += amount;
                }
            }
        }

        months
            .into_values()
            .map(|mut row| {
                row.net_flow_jpy = row.buy_amount_jpy - row.sell_amount_jpy;
                row
            })
            .collect()
    }
}

impl Default for AnalyticsService {
    fn default() -> Self {
        Self::new()
    }
}

// ── Numeric helpers ─────────────────────────────────────────────────

/// Day-over-day fractional returns. A zero previous value contributes a
/// zero return rather than a division by zero.
fn daily_returns(series: &[f64]) -> Vec<f64> {
    series
        .windows(2)
        .map(|w| if w[0] != 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
        .collect()
}

/// Returns with missing observations where the previous value was not
/// positive (symbol not held / no quote yet).
fn optional_returns(series: &[f64]) -> Vec<Option<f64>> {
    series
        .windows(2)
        .map(|w| (w[0] > 0.0).then(|| w[1] / w[0] - 1.0))
        .collect()
}

/// Sample standard deviation (ddof = 1); 0.0 under 2 observations.
fn sample_stdev(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    var.sqrt()
}

/// Running (value − peak) / peak series as fractions (≤ 0).
fn drawdowns(series: &[f64]) -> Vec<f64> {
    let mut peak = f64::MIN;
    series
        .iter()
        .map(|v| {
            peak = peak.max(*v);
            if peak != 0.0 {
                (v - peak) / peak
            } else {
                0.0
            }
        })
        .collect()
}

/// Pearson correlation over the indices where both series have an
/// observation; `None` under `min_periods` pairs or zero variance.
fn pearson(a: &[Option<f64>], b: &[Option<f64>], min_periods: usize) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b.iter())
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < min_periods {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in &pairs {
        cov += (x - mean_x) * (y - mean_y);
        var_x += (x - mean_x).powi(2);
        var_y += (y - mean_y).powi(2);
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}
