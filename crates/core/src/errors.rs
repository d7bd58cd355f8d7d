use thiserror::Error;

/// Unified error type for the entire portfolio-ledger-core library.
/// Every public fallible function returns `Result<T, CoreError>`.
///
/// Analytics functions deliberately do NOT return errors: degenerate input
/// (empty history, too few rows) yields zero/empty results so a dashboard
/// layer can always render something.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Cache file / disk ───────────────────────────────────────────
    #[error("File I/O error: {0}")]
    FileIO(String),

    #[error("Invalid cache file format: {0}")]
    InvalidCacheFormat(String),

    // ── Ledger input ────────────────────────────────────────────────
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Validation failed: {0}")]
    ValidationError(String),

    // ── Price supplier ──────────────────────────────────────────────
    #[error("API error ({provider}): {message}")]
    Api {
        provider: String,
        message: String,
    },

    #[error("Request to {provider} timed out after {seconds}s")]
    Timeout {
        provider: String,
        seconds: u64,
    },

    #[error("Price history not available for {symbol} over {period}")]
    PriceNotAvailable {
        symbol: String,
        period: String,
    },
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::FileIO(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Serialization(e.to_string())
    }
}
