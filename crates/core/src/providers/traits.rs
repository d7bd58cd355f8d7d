use async_trait::async_trait;

use crate::errors::CoreError;
use crate::models::holdings::FxRates;
use crate::models::prices::{LookbackPeriod, PricePoint, PriceTable};

/// Trait abstraction for the remote price/FX supplier.
///
/// The production implementation wraps Yahoo Finance; tests inject mocks
/// that count calls, so the cache policy (full hit / partial hit / miss) is
/// verifiable without the network.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Human-readable name of this supplier (for logs/errors).
    fn name(&self) -> &str;

    /// Daily close prices for one symbol over the lookback period,
    /// sorted by date.
    async fn close_prices(
        &self,
        symbol: &str,
        period: LookbackPeriod,
    ) -> Result<Vec<PricePoint>, CoreError>;

    /// Daily close prices for several symbols in one batched request.
    /// A failure here is a batch failure; the caller degrades to
    /// per-symbol `close_prices` calls.
    async fn batch_close_prices(
        &self,
        symbols: &[&str],
        period: LookbackPeriod,
    ) -> Result<PriceTable, CoreError>;

    /// Current conversion rates to JPY for the foreign currencies the
    /// ledger can settle in.
    async fn fx_rates(&self) -> Result<FxRates, CoreError>;
}
