pub mod analytics;
pub mod holdings;
pub mod lot;
pub mod prices;
pub mod trade;
pub mod valuation;
