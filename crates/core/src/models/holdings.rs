use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Date-indexed snapshots of per-symbol share counts, rebuilt on every
/// ledger replay and never persisted.
///
/// Each snapshot reflects ALL events up to and including its date; a symbol
/// with zero holdings is absent from the map, not present with value 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HoldingsTimeline {
    /// Trade date → {symbol → cumulative shares held}
    pub snapshots: BTreeMap<NaiveDate, HashMap<String, f64>>,
}

impl HoldingsTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Holdings as of `date`: the most recent snapshot at or before `date`.
    /// Returns an empty map before the first trade. O(log n) via the sorted
    /// date keys.
    pub fn holdings_at(&self, date: NaiveDate) -> HashMap<String, f64> {
        self.snapshots
            .range(..=date)
            .next_back()
            .map(|(_, snap)| snap.clone())
            .unwrap_or_default()
    }

    /// Date of the first trade, if any.
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.snapshots.keys().next().copied()
    }

    /// Every symbol that appears in any snapshot (held now or in the past).
    /// Sorted for deterministic iteration.
    pub fn all_symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self
            .snapshots
            .values()
            .flat_map(|snap| snap.keys().cloned())
            .collect();
        symbols.sort();
        symbols.dedup();
        symbols
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// Currency → JPY conversion rates fetched from the price supplier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FxRates {
    pub rates: HashMap<String, f64>,
}

impl FxRates {
    pub fn new(rates: HashMap<String, f64>) -> Self {
        Self { rates }
    }

    /// Conversion rate to JPY. Unknown currencies (including JPY itself when
    /// not listed) convert at 1.0 — missing FX degrades, it never fails.
    pub fn rate(&self, currency: &str) -> f64 {
        self.rates.get(currency).copied().unwrap_or(1.0)
    }
}
