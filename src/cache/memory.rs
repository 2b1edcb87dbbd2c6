//! In-memory cache backend.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::error::{CardError, Result};
use crate::models::RawRecord;

use super::{CacheKey, CacheStore};

/// Cache held in process memory. Nothing survives the process.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    /// Entries behind a mutex so the trait can take `&self`.
    entries: Mutex<HashMap<CacheKey, Vec<RawRecord>>>,
}

impl InMemoryCache {
    /// Creates an empty cache.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached keys.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |entries| entries.len())
    }

    /// Returns `true` if nothing is cached.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for InMemoryCache {
    fn read(&self, key: &CacheKey) -> Result<Option<Vec<RawRecord>>> {
        let entries = self.entries.lock().map_err(|err| poisoned(&err))?;
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &CacheKey, records: &[RawRecord]) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|err| poisoned(&err))?;
        let _old = entries.insert(key.clone(), records.to_vec());
        Ok(())
    }
}

/// Error for a poisoned cache mutex.
fn poisoned<T>(err: &PoisonError<T>) -> CardError {
    CardError::Cache(format!("in-memory cache mutex poisoned: {err}").into())
}
