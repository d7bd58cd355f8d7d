pub mod analytics_service;
pub mod cost_basis_service;
pub mod holdings_service;
pub mod ledger_service;
pub mod price_service;
pub mod valuation_service;
