use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};

use super::clock::{Clock, SystemClock};
use crate::errors::CoreError;
use crate::models::prices::{LookbackPeriod, PriceTable};

/// Default cache TTL: a few hours keeps remote queries to a handful per day
/// while keeping intraday staleness acceptable for a retrospective tool.
pub const DEFAULT_CACHE_TTL_HOURS: i64 = 4;

/// Disk-backed, TTL-bounded store of close-price tables, one file per
/// lookback period.
///
/// The cache is a pure performance optimization: a stale, corrupted, or
/// missing file is a cache miss, never an error, because the table is
/// always re-derivable from the remote supplier. Concurrent writers are
/// last-writer-wins by the same argument.
pub struct PriceCacheStore {
    dir: PathBuf,
    ttl: Duration,
    clock: Box<dyn Clock>,
}

impl PriceCacheStore {
    /// Store rooted at `dir` with the default TTL and the system clock.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ttl: Duration::hours(DEFAULT_CACHE_TTL_HOURS),
            clock: Box::new(SystemClock),
        }
    }

    /// Replace the TTL (mainly for tests and aggressive-refresh setups).
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Replace the time source (tests inject a fixed clock).
    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Cache file path for a lookback period.
    pub fn path_for(&self, period: LookbackPeriod) -> PathBuf {
        self.dir.join(period.cache_file_name())
    }

    /// Load the cached table for `period` if it exists, is within TTL, and
    /// parses. Anything else is a miss.
    pub fn load(&self, period: LookbackPeriod) -> Option<PriceTable> {
        let path = self.path_for(period);
        let modified = file_mtime(&path)?;

        let age = self.clock.now() - modified;
        if age > self.ttl {
            log::info!(
                "Price cache for {period} is stale ({}min old), treating as miss",
                age.num_minutes()
            );
            return None;
        }

        let text = match std::fs::read_to_string(&path) {
            Ok(t) => t,
            Err(e) => {
                log::warn!("Failed to read price cache {}: {e}", path.display());
                return None;
            }
        };

        match PriceTable::from_csv(&text) {
            Ok(table) if !table.is_empty() => Some(table),
            Ok(_) => None,
            Err(e) => {
                log::warn!("Corrupt price cache {}: {e}", path.display());
                None
            }
        }
    }

    /// Persist a table for `period`, creating the cache directory on first
    /// write. Read-then-overwrite; the last writer wins.
    pub fn save(&self, period: LookbackPeriod, table: &PriceTable) -> Result<(), CoreError> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path_for(period), table.to_csv())?;
        Ok(())
    }
}

/// Modification time of a file as UTC, `None` if it doesn't exist or the
/// filesystem won't say.
fn file_mtime(path: &Path) -> Option<DateTime<Utc>> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    Some(DateTime::<Utc>::from(modified))
}
