use std::time::Duration;

use crate::errors::CoreError;
use crate::models::holdings::FxRates;
use crate::models::prices::{LookbackPeriod, PriceTable};
use crate::providers::traits::QuoteProvider;
use crate::storage::price_cache::PriceCacheStore;

/// Default per-request timeout for remote price/FX calls.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Fetches close-price tables, consulting the disk cache before the remote
/// supplier.
///
/// Policy per request, for a symbol set S and lookback period P:
/// - **Full hit**: a fresh cache file covers all of S. Zero remote calls;
///   the cached table is restricted to S.
/// - **Partial hit**: a fresh file covers a strict subset. One batched call
///   for the missing symbols only, merged into the cached table and
///   persisted. If that fetch fails the cached subset is served as-is.
/// - **Miss**: no usable file. One batched call for all of S; if the batch
///   fails, per-symbol fetches with failing symbols skipped.
pub struct PriceService {
    provider: Box<dyn QuoteProvider>,
    store: PriceCacheStore,
    timeout: Duration,
}

impl PriceService {
    pub fn new(provider: Box<dyn QuoteProvider>, store: PriceCacheStore) -> Self {
        Self {
            provider,
            store,
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Replace the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Close-price table for `symbols` over `period`, forward-filled.
    ///
    /// Hits the remote supplier only for symbols the cache cannot serve.
    pub async fn get_prices(
        &self,
        symbols: &[&str],
        period: LookbackPeriod,
    ) -> Result<PriceTable, CoreError> {
        if symbols.is_empty() {
            return Ok(PriceTable::new());
        }

        match self.store.load(period) {
            Some(cached) => {
                let missing = cached.missing_symbols(symbols);
                if missing.is_empty() {
                    log::info!(
                        "Price cache hit for {period}: {} symbol(s), zero remote calls",
                        symbols.len()
                    );
                    return Ok(cached.restrict(symbols));
                }
                self.refresh_partial(cached, &missing, symbols, period).await
            }
            None => self.fetch_all(symbols, period).await,
        }
    }

    /// Current FX rates from the supplier, timeout-bounded.
    pub async fn fx_rates(&self) -> Result<FxRates, CoreError> {
        self.bounded(self.provider.fx_rates()).await
    }

    /// Partial hit: fetch only the missing symbols, merge into the cached
    /// table, persist. A fetch failure degrades to the cached subset.
    async fn refresh_partial(
        &self,
        cached: PriceTable,
        missing: &[&str],
        symbols: &[&str],
        period: LookbackPeriod,
    ) -> Result<PriceTable, CoreError> {
        log::info!(
            "Price cache partial hit for {period}: fetching {} missing symbol(s)",
            missing.len()
        );

        match self.batch_fetch(missing, period).await {
            Ok(fetched) => {
                let mut merged = cached;
                merged.merge(&fetched);
                merged.forward_fill();
                self.persist(period, &merged);
                Ok(merged.restrict(symbols))
            }
            Err(e) => {
                log::warn!(
                    "Fetch of missing symbols failed ({e}), serving cached subset for {period}"
                );
                Ok(cached.restrict(symbols))
            }
        }
    }

    /// Miss: batch-fetch everything; on batch failure fall back to
    /// per-symbol fetches, skipping symbols that still fail.
    async fn fetch_all(
        &self,
        symbols: &[&str],
        period: LookbackPeriod,
    ) -> Result<PriceTable, CoreError> {
        let mut table = match self.batch_fetch(symbols, period).await {
            Ok(table) => table,
            Err(e) => {
                log::warn!(
                    "Batch fetch for {period} failed ({e}), retrying per symbol"
                );
                let mut table = PriceTable::new();
                for symbol in symbols {
                    // Timeouts are per-symbol failures too: skip the symbol
                    // and keep whatever has been assembled so far
                    match self.bounded(self.provider.close_prices(symbol, period)).await {
                        Ok(points) => table.insert_series(symbol, &points),
                        Err(e) => {
                            log::warn!("Skipping {symbol}: {e}");
                        }
                    }
                }
                table
            }
        };

        table.forward_fill();
        if !table.is_empty() {
            self.persist(period, &table);
        }
        Ok(table)
    }

    async fn batch_fetch(
        &self,
        symbols: &[&str],
        period: LookbackPeriod,
    ) -> Result<PriceTable, CoreError> {
        self.bounded(self.provider.batch_close_prices(symbols, period)).await
    }

    /// Cache write failures are logged, not propagated: the table in hand
    /// is still good.
    fn persist(&self, period: LookbackPeriod, table: &PriceTable) {
        if let Err(e) = self.store.save(period, table) {
            log::warn!("Failed to persist price cache for {period}: {e}");
        }
    }

    /// Bound a remote call by the configured timeout.
    async fn bounded<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T, CoreError>>,
    ) -> Result<T, CoreError> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(CoreError::Timeout {
                provider: self.provider.name().to_string(),
                seconds: self.timeout.as_secs(),
            }),
        }
    }
}
