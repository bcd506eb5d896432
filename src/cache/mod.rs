//! Response cache for API calls
//!
//! Stores decoded API responses in a [`KeyValueStore`](crate::store::KeyValueStore)
//! under a fixed key prefix, together with the time they were written.
//! Entries older than the configured TTL are never served: they are removed
//! lazily on read and eagerly by a sweep that runs when the cache is built.
//! The number of entries is bounded; when the bound is reached the oldest
//! entries are evicted a batch at a time.

mod clock;
mod key;
mod manager;

pub use clock::{Clock, ManualClock, SystemClock};
pub use key::{cache_key, RequestOptions};
pub use manager::{CacheConfig, CacheEntry, CacheError, CacheStats, ResponseCache, SweepReport};
