//! Response cache with TTL expiry and capacity eviction
//!
//! Provides a `ResponseCache` that keeps serializable values in a key-value
//! store together with their write time. Storage failures never escape the
//! cache as panics: reads degrade to a miss and writes report a
//! [`CacheError`] the caller is free to drop.

use std::time::Duration;

use log::{debug, warn};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use super::clock::{Clock, SystemClock};
use crate::store::{KeyValueStore, StoreError};

/// Default time-to-live of a cache entry (one hour)
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

/// Default maximum number of entries kept in the store
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// Default number of entries evicted when the store is full
pub const DEFAULT_EVICT_BATCH: usize = 10;

/// Default prefix namespacing cache keys in the store
pub const DEFAULT_KEY_PREFIX: &str = "api_cache_";

/// Tunables for the response cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// How long an entry may be served after it was written
    pub ttl: Duration,
    /// Entry count at which inserts start evicting
    pub max_entries: usize,
    /// How many of the oldest entries one eviction removes
    pub evict_batch: usize,
    /// Prefix of every store key owned by the cache
    pub key_prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            max_entries: DEFAULT_MAX_ENTRIES,
            evict_batch: DEFAULT_EVICT_BATCH,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }
}

impl CacheConfig {
    fn ttl_millis(&self) -> i64 {
        i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX)
    }
}

/// Wrapper struct for cached data stored in the key-value store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// The cached data
    pub data: T,
    /// When the data was cached, in epoch milliseconds
    pub timestamp: i64,
}

/// Only the write time of an entry, for sweeping and eviction
#[derive(Debug, Deserialize)]
struct EntryStamp {
    timestamp: i64,
}

/// Errors that can occur when writing to the cache
#[derive(Debug, Error)]
pub enum CacheError {
    /// The underlying store failed
    #[error("Cache store failed: {0}")]
    Store(#[from] StoreError),

    /// The value could not be serialized
    #[error("Failed to serialize cache entry: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Outcome of a sweep over the cache namespace
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Entries examined
    pub scanned: usize,
    /// Entries removed because they were expired or unreadable
    pub removed: usize,
    /// Entries that could not be read or removed
    pub failed: usize,
}

/// Snapshot of the cache namespace
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Entries under the cache prefix
    pub total: usize,
    /// Entries that would be served
    pub fresh: usize,
    /// Entries past their TTL
    pub expired: usize,
    /// Entries that could not be read or parsed
    pub unreadable: usize,
}

/// Caches API responses in a key-value store
///
/// Keys passed to [`get`](Self::get) and [`put`](Self::put) are logical keys
/// (see [`cache_key`](super::cache_key)); the cache prepends its prefix
/// before touching the store and ignores every key without that prefix.
///
/// Construction runs [`sweep`](Self::sweep) once, so entries that went
/// stale between sessions are gone before the first read.
#[derive(Debug)]
pub struct ResponseCache<S, C = SystemClock> {
    store: S,
    clock: C,
    config: CacheConfig,
    startup_sweep: SweepReport,
}

impl<S: KeyValueStore> ResponseCache<S, SystemClock> {
    /// Creates a cache over `store` using wall-clock time
    pub fn new(store: S, config: CacheConfig) -> Self {
        Self::with_clock(store, SystemClock, config)
    }
}

impl<S: KeyValueStore, C: Clock> ResponseCache<S, C> {
    /// Creates a cache over `store` reading time from `clock`
    pub fn with_clock(store: S, clock: C, config: CacheConfig) -> Self {
        let mut cache = Self {
            store,
            clock,
            config,
            startup_sweep: SweepReport::default(),
        };
        let report = cache.sweep();
        debug!(
            "Startup sweep scanned {} entries, removed {}, failed {}",
            report.scanned, report.removed, report.failed
        );
        cache.startup_sweep = report;
        cache
    }

    /// What the sweep run during construction found
    pub fn startup_sweep(&self) -> SweepReport {
        self.startup_sweep
    }

    /// The configuration this cache was built with
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Reads a fresh value from the cache
    ///
    /// Returns `None` when the key is absent, when the entry has outlived
    /// the TTL (the entry is removed), or when the stored text cannot be
    /// read as an entry of `T` (the entry is removed and a warning logged).
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let storage_key = self.storage_key(key);
        let raw = match self.store.get(&storage_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("Cache miss for {}", key);
                return None;
            }
            Err(e) => {
                warn!("Failed to read cache entry {}: {}", key, e);
                return None;
            }
        };

        let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Discarding unreadable cache entry {}: {}", key, e);
                self.discard(&storage_key);
                return None;
            }
        };

        if self.is_expired(entry.timestamp) {
            debug!("Cache entry {} expired", key);
            self.discard(&storage_key);
            return None;
        }

        debug!("Cache hit for {}", key);
        Some(entry.data)
    }

    /// Writes a value to the cache, stamped with the current time
    ///
    /// When the namespace already holds `max_entries` entries, the
    /// `evict_batch` oldest are removed first.
    ///
    /// # Returns
    /// * `Ok(())` on success
    /// * `Err(CacheError)` if serialization or the store write fails; the
    ///   cache is left without the new entry
    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        let entry = CacheEntry {
            data: value,
            timestamp: self.clock.now_millis(),
        };
        let json = serde_json::to_string(&entry)?;

        self.enforce_capacity()?;
        self.store.set(&self.storage_key(key), &json)?;
        Ok(())
    }

    /// Removes every expired entry in the cache namespace
    ///
    /// Entries that cannot be parsed are removed as well, since they can
    /// never be served. The namespace is read in one pass and the stale
    /// entries are removed together; failures are logged and counted.
    pub fn sweep(&self) -> SweepReport {
        let mut report = SweepReport::default();
        let entries = match self.namespaced_entries() {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Cache sweep could not list entries: {}", e);
                report.failed += 1;
                return report;
            }
        };
        report.scanned = entries.len();

        let stale: Vec<String> = entries
            .into_iter()
            .filter(|(storage_key, raw)| match parse_stamp(raw) {
                Some(timestamp) => self.is_expired(timestamp),
                None => {
                    warn!("Sweeping unreadable cache entry {}", storage_key);
                    true
                }
            })
            .map(|(storage_key, _)| storage_key)
            .collect();
        if stale.is_empty() {
            return report;
        }

        match self.store.remove_many(&stale) {
            Ok(()) => report.removed = stale.len(),
            Err(e) => {
                warn!("Cache sweep failed to remove {} entries: {}", stale.len(), e);
                report.failed = stale.len();
            }
        }
        report
    }

    /// Removes every entry in the cache namespace, returning how many went
    pub fn clear(&self) -> Result<usize, CacheError> {
        let keys: Vec<String> = self
            .namespaced_entries()?
            .into_iter()
            .map(|(storage_key, _)| storage_key)
            .collect();
        self.store.remove_many(&keys)?;
        Ok(keys.len())
    }

    /// Counts entries in the cache namespace by freshness
    pub fn stats(&self) -> Result<CacheStats, CacheError> {
        let mut stats = CacheStats::default();
        for (_, raw) in self.namespaced_entries()? {
            stats.total += 1;
            match parse_stamp(&raw) {
                Some(timestamp) if self.is_expired(timestamp) => stats.expired += 1,
                Some(_) => stats.fresh += 1,
                None => stats.unreadable += 1,
            }
        }
        Ok(stats)
    }

    fn storage_key(&self, key: &str) -> String {
        format!("{}{}", self.config.key_prefix, key)
    }

    /// One read of every store entry under the cache prefix
    fn namespaced_entries(&self) -> Result<Vec<(String, String)>, StoreError> {
        Ok(self
            .store
            .entries()?
            .into_iter()
            .filter(|(k, _)| k.starts_with(&self.config.key_prefix))
            .collect())
    }

    fn is_expired(&self, timestamp: i64) -> bool {
        self.clock.now_millis().saturating_sub(timestamp) > self.config.ttl_millis()
    }

    fn discard(&self, storage_key: &str) {
        if let Err(e) = self.store.remove(storage_key) {
            warn!("Failed to remove cache entry {}: {}", storage_key, e);
        }
    }

    /// Evicts the oldest entries when the namespace is full
    fn enforce_capacity(&self) -> Result<(), StoreError> {
        let entries = self.namespaced_entries()?;
        if entries.len() < self.config.max_entries {
            return Ok(());
        }

        // Unreadable entries sort first so they are the first to go
        let mut stamped: Vec<(i64, String)> = entries
            .into_iter()
            .map(|(k, raw)| (parse_stamp(&raw).unwrap_or(i64::MIN), k))
            .collect();
        stamped.sort();

        let total = stamped.len();
        let batch: Vec<String> = stamped
            .into_iter()
            .take(self.config.evict_batch.max(1))
            .map(|(_, k)| k)
            .collect();
        if let Err(e) = self.store.remove_many(&batch) {
            warn!("Failed to evict {} cache entries: {}", batch.len(), e);
        }
        debug!("Cache full ({} entries), evicted {} oldest", total, batch.len());
        Ok(())
    }
}

fn parse_stamp(raw: &str) -> Option<i64> {
    serde_json::from_str::<EntryStamp>(raw)
        .ok()
        .map(|stamp| stamp.timestamp)
}
