pub mod traits;
pub mod yahoo_finance;
