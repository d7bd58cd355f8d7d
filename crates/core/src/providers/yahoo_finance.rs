use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;

use super::traits::QuoteProvider;
use crate::errors::CoreError;
use crate::models::holdings::FxRates;
use crate::models::prices::{LookbackPeriod, PricePoint, PriceTable};

/// Foreign currencies quoted for FX conversion, via `<CUR>JPY=X` tickers.
const FX_CURRENCIES: &[&str] = &["USD", "EUR", "GBP"];

/// Yahoo Finance supplier for close prices and FX rates.
///
/// - **Free**: no API key required.
/// - **Coverage**: global equities, ETFs, indices, FX pairs.
///
/// Uses the `yahoo_finance_api` crate, which accepts yfinance-style range
/// labels ("1mo" .. "max") directly, so `LookbackPeriod` maps 1:1.
pub struct YahooFinanceProvider {
    connector: yahoo_finance_api::YahooConnector,
}

impl YahooFinanceProvider {
    pub fn new() -> Result<Self, CoreError> {
        let connector = yahoo_finance_api::YahooConnector::new().map_err(|e| CoreError::Api {
            provider: "Yahoo Finance".into(),
            message: format!("Failed to create connector: {e}"),
        })?;
        Ok(Self { connector })
    }

    /// Convert a unix timestamp (seconds) to `chrono::NaiveDate`.
    fn timestamp_to_naive_date(ts: i64) -> Option<NaiveDate> {
        chrono::DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive())
    }
}

#[async_trait]
impl QuoteProvider for YahooFinanceProvider {
    fn name(&self) -> &str {
        "Yahoo Finance"
    }

    async fn close_prices(
        &self,
        symbol: &str,
        period: LookbackPeriod,
    ) -> Result<Vec<PricePoint>, CoreError> {
        let resp = self
            .connector
            .get_quote_range(symbol, "1d", period.as_str())
            .await
            .map_err(|e| CoreError::Api {
                provider: "Yahoo Finance".into(),
                message: format!("Failed to fetch {period} history for {symbol}: {e}"),
            })?;

        let quotes = resp.quotes().map_err(|e| CoreError::Api {
            provider: "Yahoo Finance".into(),
            message: format!("Failed to parse quotes for {symbol}: {e}"),
        })?;

        let mut points: Vec<PricePoint> = quotes
            .iter()
            .filter_map(|q| {
                Some(PricePoint {
                    date: Self::timestamp_to_naive_date(q.timestamp)?,
                    price: q.close,
                })
            })
            .collect();
        points.sort_by_key(|p| p.date);
        points.dedup_by_key(|p| p.date);

        if points.is_empty() {
            return Err(CoreError::PriceNotAvailable {
                symbol: symbol.to_string(),
                period: period.to_string(),
            });
        }
        Ok(points)
    }

    async fn batch_close_prices(
        &self,
        symbols: &[&str],
        period: LookbackPeriod,
    ) -> Result<PriceTable, CoreError> {
        // Yahoo has no true multi-symbol endpoint; the batch is one pass
        // over the symbols and fails as a whole so the caller can degrade
        // to per-symbol fetches with per-symbol error tolerance.
        let mut table = PriceTable::new();
        for symbol in symbols {
            let points = self.close_prices(symbol, period).await?;
            table.insert_series(symbol, &points);
        }
        Ok(table)
    }

    async fn fx_rates(&self) -> Result<FxRates, CoreError> {
        let mut rates: HashMap<String, f64> = HashMap::new();
        rates.insert("JPY".to_string(), 1.0);

        for currency in FX_CURRENCIES {
            let ticker = format!("{currency}JPY=X");
            match self.connector.get_latest_quotes(&ticker, "1d").await {
                Ok(resp) => match resp.last_quote() {
                    Ok(quote) => {
                        rates.insert(currency.to_string(), quote.close);
                    }
                    Err(e) => {
                        log::warn!("No FX quote for {ticker}: {e}");
                    }
                },
                Err(e) => {
                    log::warn!("Failed to fetch FX rate {ticker}: {e}");
                }
            }
        }

        Ok(FxRates::new(rates))
    }
}
