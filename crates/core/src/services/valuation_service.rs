use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;

use crate::models::holdings::{FxRates, HoldingsTimeline};
use crate::models::prices::PriceTable;
use crate::models::trade::{infer_currency, TradeEvent, TradeKind};
use crate::models::valuation::ValuationTable;

/// Combines the holdings timeline, the close-price table, and FX rates into
/// the daily valuation table.
///
/// The price table supplies the authoritative date axis; holdings are joined
/// onto it with a merge over the two sorted date sequences (most recent
/// snapshot at or before each pricing day).
pub struct ValuationService;

impl ValuationService {
    pub fn new() -> Self {
        Self
    }

    /// Build the daily valuation table.
    ///
    /// Per symbol and day: `shares × close × fx_to_jpy`, 0 when the symbol
    /// is not held or has no quote that day. Rows strictly before the first
    /// trade are dropped, as are symbol columns that are zero across the
    /// whole visible window (positions fully divested outside the lookback).
    pub fn build_valuation(
        &self,
        events: &[TradeEvent],
        timeline: &HoldingsTimeline,
        prices: &PriceTable,
        fx_rates: &FxRates,
    ) -> ValuationTable {
        let first_trade = match timeline.first_date() {
            Some(d) => d,
            None => return ValuationTable::new(),
        };
        if prices.is_empty() {
            return ValuationTable::new();
        }

        let symbols: Vec<String> = timeline
            .all_symbols()
            .into_iter()
            .filter(|s| !crate::models::trade::is_cash(s))
            .collect();
        if symbols.is_empty() {
            return ValuationTable::new();
        }

        let currencies = symbol_currencies(events);

        let dates: Vec<NaiveDate> = prices
            .dates
            .iter()
            .copied()
            .filter(|d| *d >= first_trade)
            .collect();
        let offset = prices.dates.len() - dates.len();

        // Merge-join the sorted snapshot dates onto the price axis instead
        // of re-scanning the timeline for every pricing day.
        let mut snapshots = timeline.snapshots.iter().peekable();
        let mut current: Option<&HashMap<String, f64>> = None;

        let mut columns: BTreeMap<String, Vec<f64>> = symbols
            .iter()
            .map(|s| (s.clone(), Vec::with_capacity(dates.len())))
            .collect();

        for (row, date) in dates.iter().enumerate() {
            while let Some((snap_date, snap)) = snapshots.peek() {
                if **snap_date <= *date {
                    current = Some(snap);
                    snapshots.next();
                } else {
                    break;
                }
            }

            for (symbol, column) in columns.iter_mut() {
                let shares = current
                    .and_then(|snap| snap.get(symbol))
                    .copied()
                    .unwrap_or(0.0);
                let value = if shares > 0.0 {
                    match prices.close_at(symbol, offset + row) {
                        Some(close) => {
                            let currency = currencies
                                .get(symbol)
                                .map(|c| c.as_str())
                                .unwrap_or_else(|| infer_currency(symbol));
                            shares * close * fx_rates.rate(currency)
                        }
                        // Missing quote for a held symbol values at zero;
                        // the valuation build never halts on price gaps
                        None => 0.0,
                    }
                } else {
                    0.0
                };
                column.push(value);
            }
        }

        // Drop columns that are zero over the whole visible window
        columns.retain(|_, col| col.iter().any(|v| *v != 0.0));

        let total: Vec<f64> = (0..dates.len())
            .map(|i| columns.values().map(|col| col[i]).sum())
            .collect();

        let invested = self.invested_series(events, fx_rates, &dates);

        ValuationTable {
            dates,
            columns,
            total,
            invested,
        }
    }

    /// Cumulative net capital contributed, forward-filled onto the date
    /// axis. Computed from shares × price × current FX (not settlement
    /// amounts), independent of market movement, clamped at zero.
    fn invested_series(
        &self,
        events: &[TradeEvent],
        fx_rates: &FxRates,
        dates: &[NaiveDate],
    ) -> Vec<f64> {
        // Running total keyed by trade date; later same-day trades overwrite
        let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        let mut cumulative = 0.0;
        for event in events.iter().filter(|e| !e.is_cash()) {
            let amount = event.shares * event.price * fx_rates.rate(&event.currency);
            match event.kind {
                TradeKind::Buy | TradeKind::Transfer => cumulative += amount,
                TradeKind::Sell => cumulative -= amount,
            }
            cumulative = cumulative.max(0.0);
            by_date.insert(event.date, cumulative);
        }

        let mut entries = by_date.iter().peekable();
        let mut current = 0.0;
        dates
            .iter()
            .map(|date| {
                while let Some((d, v)) = entries.peek() {
                    if **d <= *date {
                        current = **v;
                        entries.next();
                    } else {
                        break;
                    }
                }
                current
            })
            .collect()
    }
}

impl Default for ValuationService {
    fn default() -> Self {
        Self::new()
    }
}

/// Currency per symbol as recorded on the ledger (last entry wins).
fn symbol_currencies(events: &[TradeEvent]) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for event in events {
        map.insert(event.symbol.clone(), event.currency.clone());
    }
    map
}
