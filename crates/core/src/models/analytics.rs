use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Latest day-over-day move of the total valuation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyChange {
    pub change_jpy: f64,
    pub change_pct: f64,
}

/// Annualized risk/performance metrics over the total valuation series.
/// All fields are 0.0 when the history is too short or has zero volatility.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    /// (annual return − risk-free rate) / annual volatility
    pub sharpe_ratio: f64,

    /// Largest peak-to-trough decline, in percent (≤ 0)
    pub max_drawdown_pct: f64,

    /// Sample stdev of daily returns × √252, in percent
    pub annual_volatility_pct: f64,

    /// Compounded over actual elapsed calendar days, in percent
    pub annual_return_pct: f64,

    /// annual return / |max drawdown|
    pub calmar_ratio: f64,
}

/// One point of a date-indexed derived series (drawdown, rolling Sharpe,
/// normalized benchmark).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// A symbol's single-day move, used in the top/worst ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Performer {
    pub symbol: String,
    pub change_pct: f64,
    pub change_jpy: f64,
}

/// Best and worst single-day movers among the held symbols.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopWorstPerformers {
    /// Largest gains first
    pub top: Vec<Performer>,
    /// Largest losses first
    pub worst: Vec<Performer>,
}

/// Cumulative return of the portfolio versus a normalized benchmark over
/// their common date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkExcess {
    pub portfolio_return_pct: f64,
    pub benchmark_return_pct: f64,
    pub excess_return_pct: f64,
}

/// Pairwise Pearson correlation of daily returns across symbol columns.
/// Empty when fewer than two symbols or insufficient history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    /// Row/column labels, sorted
    pub symbols: Vec<String>,

    /// `values[i][j]` = correlation of `symbols[i]` vs `symbols[j]`;
    /// NaN where the pair had too few overlapping observations
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Correlation of a symbol pair, if both are present.
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.symbols.iter().position(|s| s == a)?;
        let j = self.symbols.iter().position(|s| s == b)?;
        self.values.get(i)?.get(j).copied()
    }
}

/// Direction of a weight-drift deviation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriftStatus {
    Overweight,
    Underweight,
}

/// A position whose actual weight deviates from its target by more than the
/// configured threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightDriftAlert {
    pub symbol: String,

    /// Current share of total valuation, in percent
    pub current_pct: f64,

    /// Target weight, in percent
    pub target_pct: f64,

    /// current − target, in percentage points (positive = overweight)
    pub drift_pct: f64,

    pub status: DriftStatus,
}

/// Month-end roll-up of the valuation table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummaryRow {
    /// Calendar month, `YYYY-MM`
    pub month: String,

    pub month_end_value_jpy: f64,
    pub invested_jpy: f64,

    /// Month-over-month change of the month-end value, percent
    pub change_pct: Option<f64>,

    /// Year-over-year change of the month-end value, percent
    pub yoy_pct: Option<f64>,

    /// month_end_value − invested
    pub unrealized_pnl_jpy: f64,
}

/// Per-month buy/sell activity aggregated from the ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeActivityRow {
    /// Calendar month, `YYYY-MM`
    pub month: String,

    pub buy_count: usize,
    pub buy_amount_jpy: f64,
    pub sell_count: usize,
    pub sell_amount_jpy: f64,

    /// buy_amount − sell_amount
    pub net_flow_jpy: f64,
}
