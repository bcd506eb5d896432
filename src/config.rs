//! Client configuration
//!
//! Collects everything needed to build a catalog client: where the backend
//! lives, how long to wait for it, and where (and whether) to cache its
//! responses.

use std::path::PathBuf;
use std::time::Duration;

use log::warn;
use thiserror::Error;

use crate::api::{CachedFetcher, HttpTransport, TransportError};
use crate::cache::{CacheConfig, ResponseCache};
use crate::catalog::AnimeClient;
use crate::store::{FileStore, KeyValueStore, MemoryStore};

/// Backend used when nothing else is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/v1";

/// Environment variable overriding the backend URL
pub const BASE_URL_ENV: &str = "VILIBRITY_API_BASE_URL";

/// Per-request timeout for backend calls
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// A store chosen at runtime
pub type DynStore = Box<dyn KeyValueStore + Send + Sync>;

/// The client the binary talks to the backend with
pub type CatalogClient = AnimeClient<HttpTransport, DynStore>;

/// Errors that can occur when building a client from configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The HTTP client could not be created
    #[error("Failed to create HTTP client: {0}")]
    Transport(#[from] TransportError),
}

/// Settings for building a [`CatalogClient`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the catalog API
    pub base_url: String,
    /// Timeout applied to every request
    pub timeout: Duration,
    /// Directory for the persistent store; the XDG cache dir when `None`
    pub cache_dir: Option<PathBuf>,
    /// Whether responses are cached at all
    pub use_cache: bool,
    /// Whether cached entries are ignored on read
    pub refresh: bool,
    /// Cache tunables
    pub cache: CacheConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            cache_dir: None,
            use_cache: true,
            refresh: false,
            cache: CacheConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Applies a base URL read from the environment; blank values are ignored
    pub fn with_env_base_url(mut self, value: Option<String>) -> Self {
        if let Some(url) = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
            self.base_url = url;
        }
        self
    }

    /// Opens the persistent store
    ///
    /// Falls back to an in-memory store when no cache directory can be
    /// determined, so the session still benefits from caching.
    pub fn open_store(&self) -> DynStore {
        match &self.cache_dir {
            Some(dir) => Box::new(FileStore::with_dir(dir.clone())),
            None => match FileStore::new() {
                Some(store) => Box::new(store),
                None => {
                    warn!("No cache directory available, caching in memory only");
                    Box::new(MemoryStore::new())
                }
            },
        }
    }

    /// Opens the response cache, sweeping stale entries
    pub fn open_cache(&self) -> ResponseCache<DynStore> {
        ResponseCache::new(self.open_store(), self.cache.clone())
    }

    /// Builds a catalog client from this configuration
    pub fn build_client(&self) -> Result<CatalogClient, ConfigError> {
        let transport = HttpTransport::new(self.base_url.clone(), self.timeout)?;
        let fetcher = if self.use_cache {
            CachedFetcher::new(transport, self.open_cache())
        } else {
            CachedFetcher::uncached(transport)
        };
        Ok(AnimeClient::new(fetcher).with_refresh(self.refresh))
    }
}
