use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// A single close-price data point (date → price).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

/// Lookback window for price history, used both as the supplier range label
/// and as the disk-cache key. `all` parses as an alias of `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LookbackPeriod {
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
    TwoYears,
    ThreeYears,
    FiveYears,
    Max,
}

impl LookbackPeriod {
    /// Range label understood by the remote supplier (yfinance-style).
    pub fn as_str(&self) -> &'static str {
        match self {
            LookbackPeriod::OneMonth => "1mo",
            LookbackPeriod::ThreeMonths => "3mo",
            LookbackPeriod::SixMonths => "6mo",
            LookbackPeriod::OneYear => "1y",
            LookbackPeriod::TwoYears => "2y",
            LookbackPeriod::ThreeYears => "3y",
            LookbackPeriod::FiveYears => "5y",
            LookbackPeriod::Max => "max",
        }
    }

    /// Cache file name for this period, one file per lookback window.
    pub fn cache_file_name(&self) -> String {
        format!("close_{}.csv", self.as_str())
    }
}

impl std::fmt::Display for LookbackPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LookbackPeriod {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1mo" => Ok(LookbackPeriod::OneMonth),
            "3mo" => Ok(LookbackPeriod::ThreeMonths),
            "6mo" => Ok(LookbackPeriod::SixMonths),
            "1y" => Ok(LookbackPeriod::OneYear),
            "2y" => Ok(LookbackPeriod::TwoYears),
            "3y" => Ok(LookbackPeriod::ThreeYears),
            "5y" => Ok(LookbackPeriod::FiveYears),
            "max" | "all" => Ok(LookbackPeriod::Max),
            other => Err(CoreError::ValidationError(format!(
                "Unknown lookback period '{other}' (expected 1mo/3mo/6mo/1y/2y/3y/5y/max)"
            ))),
        }
    }
}

/// Date-indexed table of daily close prices, one column per symbol.
///
/// `None` cells are market gaps (weekends, holidays, pre-listing days).
/// Tables handed to downstream consumers are forward-filled first, so the
/// only `None`s they see are leading gaps before a symbol's first quote.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceTable {
    /// Sorted ascending date axis shared by all columns
    pub dates: Vec<NaiveDate>,

    /// Symbol → close column, same length as `dates`
    pub closes: BTreeMap<String, Vec<Option<f64>>>,
}

impl PriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty() || self.closes.is_empty()
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.closes.keys().map(|s| s.as_str()).collect()
    }

    pub fn contains_symbol(&self, symbol: &str) -> bool {
        self.closes.contains_key(symbol)
    }

    /// Requested symbols that have no column in this table.
    pub fn missing_symbols<'a>(&self, requested: &[&'a str]) -> Vec<&'a str> {
        requested
            .iter()
            .filter(|s| !self.contains_symbol(s))
            .copied()
            .collect()
    }

    /// Close price for `symbol` at row `idx`, if quoted.
    pub fn close_at(&self, symbol: &str, idx: usize) -> Option<f64> {
        self.closes.get(symbol)?.get(idx).copied().flatten()
    }

    /// Insert (or replace) one symbol's price series, extending the date
    /// axis as needed. Existing columns are re-indexed onto the merged axis.
    pub fn insert_series(&mut self, symbol: &str, points: &[PricePoint]) {
        let mut other = PriceTable::new();
        other.dates = points.iter().map(|p| p.date).collect();
        other.dates.sort();
        other.dates.dedup();
        let column = other
            .dates
            .iter()
            .map(|d| {
                points
                    .iter()
                    .find(|p| p.date == *d)
                    .map(|p| p.price)
            })
            .collect();
        other.closes.insert(symbol.to_string(), column);
        self.merge(&other);
    }

    /// Merge another table into this one: union of date axes and symbol
    /// columns, with `other`'s cells winning on overlap.
    pub fn merge(&mut self, other: &PriceTable) {
        let mut dates: Vec<NaiveDate> = self
            .dates
            .iter()
            .chain(other.dates.iter())
            .copied()
            .collect();
        dates.sort();
        dates.dedup();

        let mut closes: BTreeMap<String, Vec<Option<f64>>> = BTreeMap::new();
        for (symbol, _) in self.closes.iter().chain(other.closes.iter()) {
            let column = dates
                .iter()
                .map(|d| {
                    other
                        .cell(symbol, *d)
                        .or_else(|| self.cell(symbol, *d))
                })
                .collect();
            closes.insert(symbol.clone(), column);
        }

        self.dates = dates;
        self.closes = closes;
    }

    /// A copy restricted to the requested symbols (missing ones skipped).
    pub fn restrict(&self, symbols: &[&str]) -> PriceTable {
        let closes: BTreeMap<String, Vec<Option<f64>>> = symbols
            .iter()
            .filter_map(|s| {
                self.closes
                    .get(*s)
                    .map(|col| (s.to_string(), col.clone()))
            })
            .collect();
        PriceTable {
            dates: self.dates.clone(),
            closes,
        }
    }

    /// Forward-fill every column across weekends/holidays so downstream
    /// consumers never see mid-series gaps. Leading gaps stay `None`.
    pub fn forward_fill(&mut self) {
        for column in self.closes.values_mut() {
            let mut last: Option<f64> = None;
            for cell in column.iter_mut() {
                match cell {
                    Some(v) => last = Some(*v),
                    None => *cell = last,
                }
            }
        }
    }

    fn cell(&self, symbol: &str, date: NaiveDate) -> Option<f64> {
        let idx = self.dates.binary_search(&date).ok()?;
        self.close_at(symbol, idx)
    }

    // ── Tabular text format (cache file body) ───────────────────────

    /// Encode as the cache file's tabular text: a `date` header column
    /// followed by one column per symbol, empty cells for gaps.
    pub fn to_csv(&self) -> String {
        let symbols: Vec<&String> = self.closes.keys().collect();
        let mut out = String::from("date");
        for s in &symbols {
            out.push(',');
            out.push_str(s);
        }
        out.push('\n');

        for (i, date) in self.dates.iter().enumerate() {
            out.push_str(&date.format("%Y-%m-%d").to_string());
            for s in &symbols {
                out.push(',');
                if let Some(v) = self.closes[*s].get(i).copied().flatten() {
                    out.push_str(&format!("{v}"));
                }
            }
            out.push('\n');
        }
        out
    }

    /// Decode the tabular text format. Any structural problem is an
    /// `InvalidCacheFormat` error; the cache store downgrades that to a miss.
    pub fn from_csv(text: &str) -> Result<PriceTable, CoreError> {
        let mut lines = text.lines();
        let header = lines
            .next()
            .ok_or_else(|| CoreError::InvalidCacheFormat("empty file".into()))?;
        let mut cols = header.split(',');
        if cols.next() != Some("date") {
            return Err(CoreError::InvalidCacheFormat(
                "first header column must be 'date'".into(),
            ));
        }
        let symbols: Vec<String> = cols.map(|s| s.to_string()).collect();

        let mut dates = Vec::new();
        let mut columns: Vec<Vec<Option<f64>>> = vec![Vec::new(); symbols.len()];

        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            let mut fields = line.split(',');
            let date_str = fields
                .next()
                .ok_or_else(|| CoreError::InvalidCacheFormat("missing date field".into()))?;
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                CoreError::InvalidCacheFormat(format!("bad date '{date_str}': {e}"))
            })?;
            dates.push(date);

            for column in columns.iter_mut() {
                let cell = fields.next().unwrap_or("");
                if cell.is_empty() {
                    column.push(None);
                } else {
                    let v = cell.parse::<f64>().map_err(|e| {
                        CoreError::InvalidCacheFormat(format!("bad price '{cell}': {e}"))
                    })?;
                    column.push(Some(v));
                }
            }
        }

        let closes = symbols.into_iter().zip(columns).collect();
        Ok(PriceTable { dates, closes })
    }
}
