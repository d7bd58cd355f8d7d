use serde_json::Value;

use crate::errors::CoreError;
use crate::models::trade::{TradeEvent, TradeKind};

/// Loads raw trade records and normalizes them into an ordered ledger.
///
/// Pure transformation — no I/O. The records come from hand-edited JSON or
/// heterogeneous broker CSV imports, so field types are loose (numbers may
/// arrive as strings) and malformed records are skipped rather than fatal.
pub struct LedgerService;

impl LedgerService {
    pub fn new() -> Self {
        Self
    }

    /// Parse a JSON array of raw trade records into an ordered ledger.
    /// The outer document must be valid JSON; individual bad records are
    /// skipped.
    pub fn load_events_from_json(&self, json: &str) -> Result<Vec<TradeEvent>, CoreError> {
        let records: Vec<Value> = serde_json::from_str(json)?;
        Ok(self.load_events(&records))
    }

    /// Normalize raw records into `TradeEvent`s sorted by
    /// `(date, kind priority)` with Transfer < Buy < Sell on the same day,
    /// so same-day acquisitions populate holdings before any sale consumes
    /// them. Malformed records are skipped.
    pub fn load_events(&self, records: &[Value]) -> Vec<TradeEvent> {
        let mut events: Vec<TradeEvent> = records
            .iter()
            .filter_map(|record| match Self::parse_record(record) {
                Some(event) => Some(event),
                None => {
                    log::debug!("Skipping malformed trade record: {record}");
                    None
                }
            })
            .collect();

        // Stable sort preserves ledger order for identical (date, kind) keys
        events.sort_by_key(|e| (e.date, e.kind.sort_priority()));
        events
    }

    fn parse_record(record: &Value) -> Option<TradeEvent> {
        let obj = record.as_object()?;

        let symbol = obj.get("symbol")?.as_str()?.trim();
        if symbol.is_empty() {
            return None;
        }

        let date_str = obj.get("date")?.as_str()?;
        let date = chrono::NaiveDate::parse_from_str(date_str, "%Y-%m-%d").ok()?;

        // Missing trade_type defaults to buy, matching historical records
        // written before the field existed
        let kind = match obj.get("trade_type").and_then(Value::as_str) {
            Some("buy") | None => TradeKind::Buy,
            Some("sell") => TradeKind::Sell,
            Some("transfer") => TradeKind::Transfer,
            Some(_) => return None,
        };

        let shares = obj.get("shares").and_then(as_f64).unwrap_or(0.0);
        let price = obj.get("price").and_then(as_f64).unwrap_or(0.0);
        if shares < 0.0 || price < 0.0 {
            return None;
        }

        let currency = obj
            .get("currency")
            .and_then(Value::as_str)
            .unwrap_or("JPY")
            .to_string();

        let mut event = TradeEvent::new(symbol, date, kind, shares, price, currency);
        event.settlement_jpy = obj.get("settlement_jpy").and_then(as_f64);
        event.settlement_foreign = obj
            .get("settlement_foreign")
            .or_else(|| obj.get("settlement_usd"))
            .and_then(as_f64);
        event.fx_rate = obj.get("fx_rate").and_then(as_f64);
        Some(event)
    }
}

impl Default for LedgerService {
    fn default() -> Self {
        Self::new()
    }
}

/// Tolerant numeric extraction: accepts JSON numbers and numeric strings.
fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}
