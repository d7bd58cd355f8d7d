use std::collections::HashMap;

use crate::models::holdings::FxRates;
use crate::models::lot::{Lot, RealizedPnl, LOT_EPSILON};
use crate::models::trade::{TradeEvent, TradeKind};

/// One strategy for resolving a trade's JPY notional from its settlement
/// fields. Returns `None` when the fields it needs are absent, passing the
/// trade on to the next strategy in the chain.
type SettlementResolver = fn(&TradeEvent) -> Option<f64>;

/// Settlement resolution chain, evaluated in priority order. The final
/// fallback (shares × price × current FX, for legacy records lacking
/// settlement and FX fields) lives in `resolve_trade_jpy` because it needs
/// the current rates.
const SETTLEMENT_RESOLVERS: &[SettlementResolver] = &[
    combined_settlement,
    jpy_settlement,
    foreign_settlement,
    trade_time_notional,
];

/// Mixed settlement: a JPY portion plus a foreign portion converted at the
/// trade-time rate.
fn combined_settlement(t: &TradeEvent) -> Option<f64> {
    let sjpy = t.settlement_jpy.filter(|v| *v > 0.0)?;
    let sfor = t.settlement_foreign.filter(|v| *v > 0.0)?;
    Some(sjpy + sfor * t.fx_rate.unwrap_or(0.0))
}

fn jpy_settlement(t: &TradeEvent) -> Option<f64> {
    t.settlement_jpy.filter(|v| *v > 0.0)
}

fn foreign_settlement(t: &TradeEvent) -> Option<f64> {
    let sfor = t.settlement_foreign.filter(|v| *v > 0.0)?;
    let fx = t.fx_rate.filter(|v| *v > 0.0)?;
    Some(sfor * fx)
}

/// No explicit settlement, but the trade-time FX rate was recorded.
fn trade_time_notional(t: &TradeEvent) -> Option<f64> {
    let fx = t.fx_rate.filter(|v| *v > 0.0)?;
    Some(t.shares * t.price * fx)
}

/// Replays the ordered ledger through FIFO lots to produce realized P&L.
///
/// Handles multi-currency settlement via the resolver chain and stock
/// splits via zero-price Transfer events. Cash-equivalent symbols are
/// excluded entirely.
pub struct CostBasisService;

impl CostBasisService {
    pub fn new() -> Self {
        Self
    }

    /// JPY notional of a trade, walking the resolver chain and falling back
    /// to shares × price × current FX rate for legacy records.
    pub fn resolve_trade_jpy(&self, event: &TradeEvent, fx_rates: &FxRates) -> f64 {
        for resolver in SETTLEMENT_RESOLVERS {
            if let Some(jpy) = resolver(event) {
                return jpy;
            }
        }
        event.shares * event.price * fx_rates.rate(&event.currency)
    }

    /// Compute realized P&L over the full ledger.
    ///
    /// - Buy / Transfer with price > 0: append a lot at
    ///   `resolved JPY cost / shares`.
    /// - Transfer with price == 0 and a non-empty lot queue: stock split —
    ///   inflate every lot's shares and deflate its per-share cost by the
    ///   same ratio, conserving total cost basis. Empty queue: no-op.
    /// - Sell: consume lots oldest-first; a sell exceeding all available
    ///   lots exhausts the queue, and the unmatched remainder is dropped
    ///   from the totals but surfaced via `unmatched_shares` and a warning.
    pub fn realized_pnl(&self, events: &[TradeEvent], fx_rates: &FxRates) -> RealizedPnl {
        let mut lots: HashMap<String, Vec<Lot>> = HashMap::new();
        let mut result = RealizedPnl::default();

        for event in events {
            if event.is_cash() {
                continue;
            }

            match event.kind {
                TradeKind::Buy => self.open_lot(&mut lots, event, fx_rates),
                TradeKind::Transfer => {
                    if event.price <= 0.0 {
                        self.apply_split(&mut lots, event);
                    } else {
                        self.open_lot(&mut lots, event, fx_rates);
                    }
                }
                TradeKind::Sell => self.consume_lots(&mut lots, event, fx_rates, &mut result),
            }
        }

        result.total_jpy = result.by_symbol.values().sum();
        result
    }

    fn open_lot(&self, lots: &mut HashMap<String, Vec<Lot>>, event: &TradeEvent, fx: &FxRates) {
        if event.shares <= 0.0 {
            return;
        }
        let total_jpy = self.resolve_trade_jpy(event, fx);
        lots.entry(event.symbol.clone())
            .or_default()
            .push(Lot::new(event.shares, total_jpy / event.shares));
    }

    fn apply_split(&self, lots: &mut HashMap<String, Vec<Lot>>, event: &TradeEvent) {
        let Some(queue) = lots.get_mut(&event.symbol) else {
            return;
        };
        let existing: f64 = queue.iter().map(|lot| lot.shares).sum();
        if existing <= 0.0 {
            // Nothing to split against
            return;
        }
        let ratio = (existing + event.shares) / existing;
        for lot in queue.iter_mut() {
            lot.shares *= ratio;
            lot.cost_per_share_jpy /= ratio;
        }
    }

    fn consume_lots(
        &self,
        lots: &mut HashMap<String, Vec<Lot>>,
        event: &TradeEvent,
        fx: &FxRates,
        result: &mut RealizedPnl,
    ) {
        if event.shares <= 0.0 {
            return;
        }
        let total_jpy = self.resolve_trade_jpy(event, fx);
        let proceeds_per_share = total_jpy / event.shares;

        let queue = lots.entry(event.symbol.clone()).or_default();
        let mut remaining = event.shares;

        while remaining > LOT_EPSILON && !queue.is_empty() {
            let lot = &mut queue[0];
            let take = remaining.min(lot.shares);
            *result.by_symbol.entry(event.symbol.clone()).or_insert(0.0) +=
                take * (proceeds_per_share - lot.cost_per_share_jpy);
            lot.shares -= take;
            remaining -= take;
            if lot.shares < LOT_EPSILON {
                queue.remove(0);
            }
        }

        if remaining > LOT_EPSILON {
            // Over-sell: the clamp keeps the observed numerics, the warning
            // and diagnostic surface the data problem.
            log::warn!(
                "Sell of {} {} on {} exceeds available lots by {:.4} shares; \
                 unmatched portion excluded from realized P&L",
                event.shares,
                event.symbol,
                event.date,
                remaining,
            );
            *result
                .unmatched_shares
                .entry(event.symbol.clone())
                .or_insert(0.0) += remaining;
        }
    }
}

impl Default for CostBasisService {
    fn default() -> Self {
        Self::new()
    }
}
