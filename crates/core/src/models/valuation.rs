use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily valuation of the portfolio: one JPY column per symbol plus the
/// `total` and `invested` aggregate columns, on the price table's date axis.
///
/// Invariants: `total[i]` equals the row-wise sum of the symbol columns;
/// `invested` is non-decreasing except across Sell events and never negative.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValuationTable {
    /// Sorted ascending date axis
    pub dates: Vec<NaiveDate>,

    /// Symbol → per-day value in JPY, same length as `dates`
    pub columns: BTreeMap<String, Vec<f64>>,

    /// Row-wise sum of the symbol columns
    pub total: Vec<f64>,

    /// Cumulative net capital contributed (running Buy/Transfer − Sell,
    /// clamped at zero), forward-filled onto the date axis
    pub invested: Vec<f64>,
}

impl ValuationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Number of rows (days).
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Symbol columns in deterministic (sorted) order.
    pub fn symbols(&self) -> Vec<&str> {
        self.columns.keys().map(|s| s.as_str()).collect()
    }

    /// Most recent total valuation, 0.0 when empty.
    pub fn last_total(&self) -> f64 {
        self.total.last().copied().unwrap_or(0.0)
    }

    /// One symbol's value series, if present.
    pub fn column(&self, symbol: &str) -> Option<&[f64]> {
        self.columns.get(symbol).map(|v| v.as_slice())
    }
}
