use std::collections::HashMap;

use crate::models::holdings::HoldingsTimeline;
use crate::models::trade::{TradeEvent, TradeKind};

/// Replays the ordered ledger into date-indexed holdings snapshots.
///
/// Pure business logic — no I/O, no prices. Easy to test.
pub struct HoldingsService;

impl HoldingsService {
    pub fn new() -> Self {
        Self
    }

    /// Reconstruct per-symbol share counts for every trade date.
    ///
    /// Maintains a running accumulator; after applying each event the whole
    /// accumulator is snapshotted under that event's date, so a later event
    /// on the same date overwrites the snapshot and every snapshot reflects
    /// all events up to and including its date.
    ///
    /// A Sell for more shares than held clamps to zero (data-entry
    /// tolerance, not a hard failure); symbols at zero are removed from the
    /// accumulator entirely.
    pub fn reconstruct(&self, events: &[TradeEvent]) -> HoldingsTimeline {
        let mut cumulative: HashMap<String, f64> = HashMap::new();
        let mut timeline = HoldingsTimeline::new();

        for event in events {
            match event.kind {
                TradeKind::Buy | TradeKind::Transfer => {
                    *cumulative.entry(event.symbol.clone()).or_insert(0.0) += event.shares;
                }
                TradeKind::Sell => {
                    let remaining = (cumulative.get(&event.symbol).copied().unwrap_or(0.0)
                        - event.shares)
                        .max(0.0);
                    if remaining > 0.0 {
                        cumulative.insert(event.symbol.clone(), remaining);
                    } else {
                        cumulative.remove(&event.symbol);
                    }
                }
            }

            timeline
                .snapshots
                .insert(event.date, cumulative.clone());
        }

        timeline
    }
}

impl Default for HoldingsService {
    fn default() -> Self {
        Self::new()
    }
}
