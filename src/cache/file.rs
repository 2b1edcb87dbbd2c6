//! JSON-file cache backend.
//!
//! One pretty-printed JSON array per key, under a single directory
//! (default: `temp/` in the working directory).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{CardError, Result};
use crate::models::RawRecord;

use super::{CacheKey, CacheStore};

/// Default cache directory, relative to the working directory.
pub const DEFAULT_CACHE_DIR: &str = "temp";

/// File-backed cache.
///
/// # File layout
///
/// ```text
/// <dir>/
///   data_2021-09-01_2022-08-31_<account>.json
///   data_2022-09-01_2023-08-31_<account>.json
///   ...
/// ```
#[derive(Debug, Clone)]
pub struct FileCache {
    /// Directory holding the cache files.
    dir: PathBuf,
}

impl Default for FileCache {
    #[inline]
    fn default() -> Self {
        Self::new(PathBuf::from(DEFAULT_CACHE_DIR))
    }
}

impl FileCache {
    /// Creates a cache rooted at `dir`. The directory is created lazily on
    /// the first write.
    #[inline]
    #[must_use]
    pub const fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Directory holding the cache files.
    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path of the entry for `key`.
    #[inline]
    #[must_use]
    pub fn path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }
}

impl CacheStore for FileCache {
    fn read(&self, key: &CacheKey) -> Result<Option<Vec<RawRecord>>> {
        let path = self.path(key);
        match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)
                .map(Some)
                .map_err(CardError::from),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(cache_io_error(err)),
        }
    }

    /// Writes to a `.tmp` sibling first, then renames over the entry.
    fn write(&self, key: &CacheKey, records: &[RawRecord]) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(cache_io_error)?;
        let path = self.path(key);
        let tmp_path = self.dir.join(format!("{}.tmp", key.file_name()));
        let json = serde_json::to_string_pretty(records)?;
        fs::write(&tmp_path, json).map_err(cache_io_error)?;
        fs::rename(&tmp_path, &path).map_err(cache_io_error)?;
        tracing::debug!(path = %path.display(), rows = records.len(), "cache entry written");
        Ok(())
    }
}

/// Converts an I/O error into a [`CardError::Cache`].
fn cache_io_error(err: io::Error) -> CardError {
    CardError::Cache(Box::new(err))
}
