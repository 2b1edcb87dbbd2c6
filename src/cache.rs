//! Cache of raw transaction lists, keyed by query.
//!
//! The report service's hallticket expires quickly, so every successful
//! fetch is kept and reused on later runs. Entries are never invalidated;
//! callers bypass them by fetching with `use_cache = false`.

mod file;
mod memory;

use core::fmt;

use crate::error::Result;
use crate::models::{DateRange, RawRecord};

pub use file::{DEFAULT_CACHE_DIR, FileCache};
pub use memory::InMemoryCache;

/// Identifies one cached query: the date range and the account.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Start date, `YYYY-MM-DD`.
    start: String,
    /// End date, `YYYY-MM-DD`.
    end: String,
    /// Card account identifier.
    account: String,
}

impl CacheKey {
    /// Creates the key for `range` queried on `account`.
    #[inline]
    #[must_use]
    pub fn new(range: &DateRange, account: &str) -> Self {
        Self {
            start: range.start().to_string(),
            end: range.end().to_string(),
            account: account.to_owned(),
        }
    }

    /// File name for this key: `data_{start}_{end}_{account}.json`.
    ///
    /// Path separators in the account are replaced so the entry always
    /// stays inside the cache directory.
    #[inline]
    #[must_use]
    pub fn file_name(&self) -> String {
        let account: String = self
            .account
            .chars()
            .map(|ch| if matches!(ch, '/' | '\\') { '_' } else { ch })
            .collect();
        format!("data_{}_{}_{account}.json", self.start, self.end)
    }
}

impl fmt::Display for CacheKey {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{} ({})", self.start, self.end, self.account)
    }
}

/// Storage backend for cached transaction lists.
pub trait CacheStore: fmt::Debug {
    /// Returns the cached list for `key`, or `Ok(None)` if nothing is
    /// cached.
    ///
    /// # Errors
    ///
    /// Returns an error if an entry exists but cannot be read or parsed.
    fn read(&self, key: &CacheKey) -> Result<Option<Vec<RawRecord>>>;

    /// Stores `records` under `key`, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be written.
    fn write(&self, key: &CacheKey, records: &[RawRecord]) -> Result<()>;
}
