use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A lot's share count below this threshold is treated as fully consumed
/// and the lot is discarded.
pub const LOT_EPSILON: f64 = 1e-6;

/// One FIFO cost-basis unit: a batch of shares bought at a common
/// JPY-equivalent price.
///
/// Lots are created by Buy and Transfer-with-price events and consumed
/// oldest-first by Sell events. A zero-price Transfer (stock split) rescales
/// every existing lot so that `shares * cost_per_share_jpy` is conserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lot {
    /// Remaining shares in this lot
    pub shares: f64,

    /// JPY-equivalent cost per share at acquisition time
    pub cost_per_share_jpy: f64,
}

impl Lot {
    pub fn new(shares: f64, cost_per_share_jpy: f64) -> Self {
        Self {
            shares,
            cost_per_share_jpy,
        }
    }

    /// Total cost basis carried by this lot.
    pub fn cost_basis(&self) -> f64 {
        self.shares * self.cost_per_share_jpy
    }
}

/// Realized profit and loss produced by one full ledger replay.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RealizedPnl {
    /// Realized P&L per symbol, in JPY
    pub by_symbol: HashMap<String, f64>,

    /// Sum across all symbols, in JPY
    pub total_jpy: f64,

    /// Shares sold with no matching lot (over-sell clamp diagnostic).
    /// The unmatched portion is dropped from `by_symbol`, so a non-empty map
    /// here means realized P&L is an under-count for those symbols.
    #[serde(default)]
    pub unmatched_shares: HashMap<String, f64>,
}

impl RealizedPnl {
    /// Realized P&L for one symbol (0.0 when the symbol never sold).
    pub fn for_symbol(&self, symbol: &str) -> f64 {
        self.by_symbol.get(symbol).copied().unwrap_or(0.0)
    }
}
