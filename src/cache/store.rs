//! JSON cache store keyed by region label or country label key

use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::observe::SharedObserver;

/// Errors that can occur while reading or writing cache entries
#[derive(Debug, Error)]
pub enum CacheError {
    /// The key cannot be used as a file name
    #[error("Invalid cache key: '{0}'")]
    InvalidKey(String),

    /// Directory creation, read or write failed
    #[error("Cache I/O failed for '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// The payload could not be serialized
    #[error("Failed to serialize cache entry '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The file exists but does not hold valid JSON
    #[error("Failed to parse cache entry '{key}': {source}")]
    Parse {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Reads and writes JSON blobs under a single cache directory
///
/// The directory is created lazily on the first write.
#[derive(Clone)]
pub struct CacheStore {
    cache_dir: PathBuf,
    observer: SharedObserver,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("cache_dir", &self.cache_dir)
            .finish()
    }
}

/// Rejects keys that would resolve outside their directory
pub(crate) fn validate_key(key: &str) -> bool {
    !key.is_empty()
        && key != "."
        && key != ".."
        && !key.contains(['/', '\\', '\0'])
}

impl CacheStore {
    /// Creates a store rooted at `cache_dir`
    pub fn new(cache_dir: impl Into<PathBuf>, observer: SharedObserver) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            observer,
        }
    }

    /// Directory holding the cache files
    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns the path to the cache file for the given key
    pub fn entry_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", key))
    }

    /// Whether an entry for `key` is already on disk
    pub fn contains(&self, key: &str) -> bool {
        validate_key(key) && self.entry_path(key).is_file()
    }

    /// Serializes `data` and writes it to `<key>.json`, replacing any existing entry
    pub fn write(&self, key: &str, data: &Value) -> Result<(), CacheError> {
        let result = self.try_write(key, data);
        match &result {
            Ok(()) => self.observer.info(&format!("{}.json cache created", key)),
            Err(e) => self
                .observer
                .error(&format!("Error creating {}.json cache: {}", key, e)),
        }
        result
    }

    fn try_write(&self, key: &str, data: &Value) -> Result<(), CacheError> {
        if !validate_key(key) {
            return Err(CacheError::InvalidKey(key.to_string()));
        }

        if !self.cache_dir.exists() {
            self.observer
                .info(&format!("Creating {} directory...", self.cache_dir.display()));
        }
        fs::create_dir_all(&self.cache_dir).map_err(|source| CacheError::Io {
            key: key.to_string(),
            source,
        })?;

        let json = serde_json::to_string(data).map_err(|source| CacheError::Serialize {
            key: key.to_string(),
            source,
        })?;

        fs::write(self.entry_path(key), json).map_err(|source| CacheError::Io {
            key: key.to_string(),
            source,
        })
    }

    /// Reads the entry for `key`
    ///
    /// # Returns
    /// * `Ok(Some(value))` if the entry exists and parses
    /// * `Ok(None)` if there is no entry for this key
    /// * `Err(CacheError)` if the entry exists but cannot be read or parsed
    pub fn read(&self, key: &str) -> Result<Option<Value>, CacheError> {
        self.observer
            .info(&format!("Checking cache file: {}", self.entry_path(key).display()));

        let result = self.try_read(key);
        match &result {
            Ok(Some(_)) => self.observer.info(&format!("{}.json cache loaded", key)),
            Ok(None) => self.observer.info(&format!("No cache found for {}", key)),
            Err(e) => self
                .observer
                .error(&format!("Error reading {}.json cache: {}", key, e)),
        }
        result
    }

    fn try_read(&self, key: &str) -> Result<Option<Value>, CacheError> {
        if !validate_key(key) {
            return Err(CacheError::InvalidKey(key.to_string()));
        }

        let content = match fs::read_to_string(self.entry_path(key)) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(CacheError::Io {
                    key: key.to_string(),
                    source,
                })
            }
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| CacheError::Parse {
                key: key.to_string(),
                source,
            })
    }
}
