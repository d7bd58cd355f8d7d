use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Suffix marking a cash-equivalent position (e.g. `JPY.CASH`, `USD.CASH`).
/// Cash positions carry no market risk and are excluded from cost-basis
/// accounting and valuation.
pub const CASH_SUFFIX: &str = ".CASH";

/// Kind of ledger entry.
///
/// The variants carry an explicit same-day ordering: inbound transfers and
/// purchases must populate the holdings before any same-day sale tries to
/// consume them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeKind {
    /// Inbound transfer. With a price it behaves like a buy with a known
    /// cost basis; with price zero it models a stock split.
    Transfer,
    /// Acquisition of shares
    Buy,
    /// Disposal of shares
    Sell,
}

impl TradeKind {
    /// Same-day sort priority: Transfer < Buy < Sell.
    pub fn sort_priority(&self) -> u8 {
        match self {
            TradeKind::Transfer => 0,
            TradeKind::Buy => 1,
            TradeKind::Sell => 2,
        }
    }
}

impl std::fmt::Display for TradeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeKind::Transfer => write!(f, "transfer"),
            TradeKind::Buy => write!(f, "buy"),
            TradeKind::Sell => write!(f, "sell"),
        }
    }
}

/// A single entry of the append-only trade ledger.
///
/// Immutable once recorded. The ledger is the sole source of truth: holdings,
/// cost basis, and valuation are always re-derived by replaying it from empty
/// state, never persisted.
///
/// The settlement fields are optional because the ledger may be hand-edited
/// or imported from heterogeneous broker exports; their absence degrades
/// through the resolver chain in `CostBasisService`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    /// Instrument symbol (e.g. "7203.T", "AAPL") or a cash marker
    pub symbol: String,

    /// Trade date (no time component — daily granularity)
    pub date: NaiveDate,

    /// Buy, Sell, or Transfer
    pub kind: TradeKind,

    /// Number of shares (always non-negative)
    pub shares: f64,

    /// Per-share price in `currency`
    pub price: f64,

    /// ISO currency code of `price` (e.g. "JPY", "USD")
    pub currency: String,

    /// Settlement amount in JPY, if the broker recorded one
    #[serde(default)]
    pub settlement_jpy: Option<f64>,

    /// Settlement amount in the foreign currency, if recorded
    #[serde(default)]
    pub settlement_foreign: Option<f64>,

    /// FX rate (foreign → JPY) at trade time, if recorded
    #[serde(default)]
    pub fx_rate: Option<f64>,
}

impl TradeEvent {
    pub fn new(
        symbol: impl Into<String>,
        date: NaiveDate,
        kind: TradeKind,
        shares: f64,
        price: f64,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            date,
            kind,
            shares,
            price,
            currency: currency.into(),
            settlement_jpy: None,
            settlement_foreign: None,
            fx_rate: None,
        }
    }

    /// Whether this entry refers to a cash-equivalent position.
    pub fn is_cash(&self) -> bool {
        is_cash(&self.symbol)
    }
}

/// Whether a symbol is a cash-equivalent marker (`<CUR>.CASH`).
pub fn is_cash(symbol: &str) -> bool {
    symbol.ends_with(CASH_SUFFIX)
}

/// Best-effort currency inference for symbols whose ledger entries are not
/// at hand: Tokyo Stock Exchange tickers settle in JPY, everything else is
/// assumed USD. Valuation prefers the currency recorded on the ledger and
/// only falls back to this.
pub fn infer_currency(symbol: &str) -> &'static str {
    if symbol.ends_with(".T") {
        "JPY"
    } else {
        "USD"
    }
}
