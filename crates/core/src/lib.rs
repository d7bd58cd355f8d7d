pub mod errors;
pub mod models;
pub mod providers;
pub mod services;
pub mod storage;

use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDate;

use errors::CoreError;
use models::{
    analytics::{
        BenchmarkExcess, CorrelationMatrix, DailyChange, MonthlySummaryRow, RiskMetrics,
        SeriesPoint, TopWorstPerformers, TradeActivityRow, WeightDriftAlert,
    },
    holdings::{FxRates, HoldingsTimeline},
    lot::RealizedPnl,
    prices::{LookbackPeriod, PricePoint},
    trade::TradeEvent,
    valuation::ValuationTable,
};
use providers::traits::QuoteProvider;
use services::{
    analytics_service::{
        AnalyticsService, DEFAULT_DRIFT_THRESHOLD_PCT, DEFAULT_MIN_CORRELATION_PERIODS,
        DEFAULT_ROLLING_WINDOW, DEFAULT_TOP_N,
    },
    cost_basis_service::CostBasisService,
    holdings_service::HoldingsService,
    ledger_service::LedgerService,
    price_service::PriceService,
    valuation_service::ValuationService,
};
use storage::price_cache::PriceCacheStore;

/// Main entry point for the portfolio ledger core library.
///
/// Holds the trade ledger (the sole source of truth) and the services that
/// derive everything else from it. Holdings, cost basis, and valuation are
/// recomputed from the ledger on demand, never persisted.
#[must_use]
pub struct PortfolioLedger {
    events: Vec<TradeEvent>,
    ledger_service: LedgerService,
    holdings_service: HoldingsService,
    cost_basis_service: CostBasisService,
    valuation_service: ValuationService,
    analytics_service: AnalyticsService,
    price_service: PriceService,
}

impl std::fmt::Debug for PortfolioLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortfolioLedger")
            .field("events", &self.events.len())
            .finish()
    }
}

impl PortfolioLedger {
    /// Create a ledger engine backed by `provider` for quotes and FX, with
    /// the price cache rooted at `cache_dir`.
    pub fn new(provider: Box<dyn QuoteProvider>, cache_dir: impl AsRef<Path>) -> Self {
        let store = PriceCacheStore::new(cache_dir.as_ref());
        Self {
            events: Vec::new(),
            ledger_service: LedgerService::new(),
            holdings_service: HoldingsService::new(),
            cost_basis_service: CostBasisService::new(),
            valuation_service: ValuationService::new(),
            analytics_service: AnalyticsService::new(),
            price_service: PriceService::new(provider, store),
        }
    }

    /// Replace the price service (custom TTL, timeout, or clock).
    pub fn with_price_service(mut self, price_service: PriceService) -> Self {
        self.price_service = price_service;
        self
    }

    // ── Ledger ──────────────────────────────────────────────────────

    /// Load the ledger from a JSON array of raw trade records, replacing
    /// any previously loaded events. Malformed records are skipped; the
    /// result is sorted by (date, same-day kind priority).
    pub fn load_json(&mut self, json: &str) -> Result<usize, CoreError> {
        self.events = self.ledger_service.load_events_from_json(json)?;
        Ok(self.events.len())
    }

    /// Load the ledger from already-parsed JSON records.
    pub fn load_records(&mut self, records: &[serde_json::Value]) -> usize {
        self.events = self.ledger_service.load_events(records);
        self.events.len()
    }

    /// The ordered ledger.
    #[must_use]
    pub fn events(&self) -> &[TradeEvent] {
        &self.events
    }

    // ── Holdings ────────────────────────────────────────────────────

    /// Rebuild the date-indexed holdings timeline from the ledger.
    pub fn holdings_timeline(&self) -> HoldingsTimeline {
        self.holdings_service.reconstruct(&self.events)
    }

    /// Per-symbol share counts as of `date`.
    #[must_use]
    pub fn holdings_on(&self, date: NaiveDate) -> HashMap<String, f64> {
        self.holdings_timeline().holdings_at(date)
    }

    // ── Cost basis ──────────────────────────────────────────────────

    /// Realized P&L from a full FIFO replay of the ledger.
    pub fn realized_pnl(&self, fx_rates: &FxRates) -> RealizedPnl {
        self.cost_basis_service.realized_pnl(&self.events, fx_rates)
    }

    // ── Prices & valuation ──────────────────────────────────────────

    /// Current FX rates from the supplier. A fetch failure degrades to
    /// identity rates (everything converts at 1.0) with a warning, so a
    /// JPY-only portfolio keeps working offline.
    pub async fn fx_rates(&self) -> FxRates {
        match self.price_service.fx_rates().await {
            Ok(rates) => rates,
            Err(e) => {
                log::warn!("FX rates unavailable ({e}), converting at 1.0");
                FxRates::default()
            }
        }
    }

    /// Build the daily valuation table over `period`: fetch close prices
    /// for every non-cash symbol the ledger has ever held (cache first),
    /// then join holdings and FX onto the price axis.
    pub async fn build_valuation(
        &self,
        period: LookbackPeriod,
    ) -> Result<ValuationTable, CoreError> {
        let timeline = self.holdings_timeline();
        let symbols: Vec<String> = timeline
            .all_symbols()
            .into_iter()
            .filter(|s| !models::trade::is_cash(s))
            .collect();
        if symbols.is_empty() {
            return Ok(ValuationTable::new());
        }
        let symbol_refs: Vec<&str> = symbols.iter().map(String::as_str).collect();

        let prices = self.price_service.get_prices(&symbol_refs, period).await?;
        let fx_rates = self.fx_rates().await;

        Ok(self
            .valuation_service
            .build_valuation(&self.events, &timeline, &prices, &fx_rates))
    }

    /// Benchmark close series over `period`, normalized onto the
    /// portfolio's scale (both start at the portfolio's first total).
    pub async fn benchmark_series(
        &self,
        symbol: &str,
        period: LookbackPeriod,
        table: &ValuationTable,
    ) -> Result<Vec<SeriesPoint>, CoreError> {
        let prices = self.price_service.get_prices(&[symbol], period).await?;
        let points: Vec<PricePoint> = prices
            .dates
            .iter()
            .enumerate()
            .filter_map(|(i, date)| {
                prices.close_at(symbol, i).map(|price| PricePoint {
                    date: *date,
                    price,
                })
            })
            .collect();
        Ok(self.analytics_service.normalize_benchmark(table, &points))
    }

    // ── Analytics ───────────────────────────────────────────────────

    /// Latest day-over-day move of the total valuation.
    #[must_use]
    pub fn daily_change(&self, table: &ValuationTable) -> DailyChange {
        self.analytics_service.daily_change(table)
    }

    /// Annualized return/volatility/Sharpe, max drawdown, and Calmar.
    #[must_use]
    pub fn risk_metrics(&self, table: &ValuationTable) -> RiskMetrics {
        self.analytics_service.risk_metrics(table)
    }

    /// Running drawdown series in percent.
    #[must_use]
    pub fn drawdown_series(&self, table: &ValuationTable) -> Vec<SeriesPoint> {
        self.analytics_service.drawdown_series(table)
    }

    /// Rolling Sharpe ratio over the default window.
    #[must_use]
    pub fn rolling_sharpe(&self, table: &ValuationTable) -> Vec<SeriesPoint> {
        self.analytics_service
            .rolling_sharpe(table, DEFAULT_ROLLING_WINDOW)
    }

    /// Best and worst single-day movers among held symbols.
    #[must_use]
    pub fn top_worst_performers(&self, table: &ValuationTable) -> TopWorstPerformers {
        self.analytics_service
            .top_worst_performers(table, DEFAULT_TOP_N)
    }

    /// Cumulative portfolio return versus a normalized benchmark.
    #[must_use]
    pub fn benchmark_excess(
        &self,
        table: &ValuationTable,
        benchmark: &[SeriesPoint],
    ) -> Option<BenchmarkExcess> {
        self.analytics_service.benchmark_excess(table, benchmark)
    }

    /// Pairwise correlation of daily returns between symbol columns.
    #[must_use]
    pub fn correlation_matrix(&self, table: &ValuationTable) -> CorrelationMatrix {
        self.analytics_service
            .correlation_matrix(table, DEFAULT_MIN_CORRELATION_PERIODS)
    }

    /// Positions drifting beyond the default threshold from their target
    /// weights (equal weight when no target is given).
    #[must_use]
    pub fn weight_drift(
        &self,
        table: &ValuationTable,
        target_weights: Option<&HashMap<String, f64>>,
    ) -> Vec<WeightDriftAlert> {
        self.analytics_service
            .weight_drift(table, target_weights, DEFAULT_DRIFT_THRESHOLD_PCT)
    }

    /// Month-end totals with MoM/YoY change and unrealized P&L.
    #[must_use]
    pub fn monthly_summary(&self, table: &ValuationTable) -> Vec<MonthlySummaryRow> {
        self.analytics_service.monthly_summary(table)
    }

    /// Per-month buy/sell counts, notionals, and net flow from the ledger.
    #[must_use]
    pub fn trade_activity(&self, fx_rates: &FxRates) -> Vec<TradeActivityRow> {
        self.analytics_service.trade_activity(&self.events, fx_rates)
    }
}
