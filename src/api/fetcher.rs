//! Fetch-with-cache wrapper

use log::{debug, warn};
use serde_json::Value;

use super::{ApiResponse, Transport};
use crate::cache::{cache_key, Clock, RequestOptions, ResponseCache, SystemClock};
use crate::store::KeyValueStore;

/// Fetches JSON from the backend, serving repeat requests from the cache
///
/// Only successful responses are cached. Failures are returned to the
/// caller and forgotten, so the next identical request goes back to the
/// network. Cache write failures are logged and dropped: the caller still
/// gets the response that was fetched.
///
/// Concurrent requests for the same uncached key are not coalesced; each
/// goes to the network and the last write wins.
pub struct CachedFetcher<T, S, C = SystemClock> {
    transport: T,
    cache: Option<ResponseCache<S, C>>,
}

impl<T, S, C> CachedFetcher<T, S, C>
where
    T: Transport,
    S: KeyValueStore,
    C: Clock,
{
    /// Creates a fetcher that consults `cache` before the network
    pub fn new(transport: T, cache: ResponseCache<S, C>) -> Self {
        Self {
            transport,
            cache: Some(cache),
        }
    }

    /// Creates a fetcher that always goes to the network
    pub fn uncached(transport: T) -> Self {
        Self {
            transport,
            cache: None,
        }
    }

    /// The cache in front of the transport, if any
    pub fn cache(&self) -> Option<&ResponseCache<S, C>> {
        self.cache.as_ref()
    }

    /// The underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetches `endpoint`, answering from the cache when a fresh entry exists
    pub async fn fetch(&self, endpoint: &str, options: &RequestOptions) -> ApiResponse<Value> {
        let key = cache_key(endpoint, options);
        if let Some(cache) = &self.cache {
            if let Some(mut hit) = cache.get::<ApiResponse<Value>>(&key) {
                debug!("Serving {} from cache", endpoint);
                hit.from_cache = true;
                return hit;
            }
        }
        self.fetch_and_store(endpoint, options, &key).await
    }

    /// Fetches `endpoint` from the network even if a cached entry exists
    ///
    /// A successful response still replaces the cached one.
    pub async fn fetch_fresh(&self, endpoint: &str, options: &RequestOptions) -> ApiResponse<Value> {
        let key = cache_key(endpoint, options);
        self.fetch_and_store(endpoint, options, &key).await
    }

    async fn fetch_and_store(
        &self,
        endpoint: &str,
        options: &RequestOptions,
        key: &str,
    ) -> ApiResponse<Value> {
        let response = self.request(endpoint, options).await;

        if response.is_success() {
            if let Some(cache) = &self.cache {
                if let Err(e) = cache.put(key, &response) {
                    warn!("Could not cache response for {}: {}", endpoint, e);
                }
            }
        } else {
            debug!(
                "Not caching failed response for {} (status {})",
                endpoint, response.status
            );
        }

        response
    }

    async fn request(&self, endpoint: &str, options: &RequestOptions) -> ApiResponse<Value> {
        let raw = match self.transport.get(endpoint, options).await {
            Ok(raw) => raw,
            Err(e) => return ApiResponse::failure(e.to_string(), 0),
        };

        if !(200..=299).contains(&raw.status) {
            return ApiResponse::failure(format!("HTTP error! status: {}", raw.status), raw.status);
        }

        match serde_json::from_str::<Value>(&raw.body) {
            Ok(data) => ApiResponse::ok(data, raw.status),
            Err(e) => ApiResponse::failure(
                format!("Failed to parse JSON response: {}", e),
                raw.status,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{TransportError, TransportResponse};
    use crate::cache::{CacheConfig, ManualClock};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays scripted responses in order, repeating the last one
    struct ScriptedTransport {
        script: Mutex<Vec<Result<TransportResponse, String>>>,
        calls: AtomicUsize,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<TransportResponse, String>>) -> Self {
            Self {
                script: Mutex::new(script),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn get(
            &self,
            _endpoint: &str,
            _options: &RequestOptions,
        ) -> Result<TransportResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            let next = if script.len() > 1 {
                script.remove(0)
            } else {
                script[0].clone()
            };
            next.map_err(TransportError::Unreachable)
        }
    }

    fn reply(status: u16, body: &str) -> Result<TransportResponse, String> {
        Ok(TransportResponse {
            status,
            body: body.to_string(),
        })
    }

    fn fetcher(
        script: Vec<Result<TransportResponse, String>>,
    ) -> CachedFetcher<ScriptedTransport, MemoryStore, ManualClock> {
        let cache = ResponseCache::with_clock(
            MemoryStore::new(),
            ManualClock::at(0),
            CacheConfig::default(),
        );
        CachedFetcher::new(ScriptedTransport::new(script), cache)
    }

    #[tokio::test]
    async fn test_success_is_decoded_and_cached() {
        let fetcher = fetcher(vec![reply(200, r#"{"trending":[]}"#)]);
        let options = RequestOptions::new().param("page", 1);

        let first = fetcher.fetch("/anime/trending", &options).await;
        let second = fetcher.fetch("/anime/trending", &options).await;

        assert_eq!(first, ApiResponse::ok(json!({"trending": []}), 200));
        assert_eq!(second, first);
        assert!(!first.from_cache);
        assert!(second.from_cache);
        assert_eq!(fetcher.transport().calls(), 1);
    }

    #[tokio::test]
    async fn test_http_error_is_reported_and_not_cached() {
        let fetcher = fetcher(vec![reply(503, "down"), reply(200, "[]")]);
        let options = RequestOptions::new();

        let first = fetcher.fetch("/anime/popular", &options).await;
        assert!(first.data.is_none());
        assert_eq!(first.status, 503);
        assert_eq!(first.error.as_deref(), Some("HTTP error! status: 503"));

        let second = fetcher.fetch("/anime/popular", &options).await;
        assert_eq!(second, ApiResponse::ok(json!([]), 200));
        assert_eq!(fetcher.transport().calls(), 2);
    }

    #[tokio::test]
    async fn test_network_failure_has_status_zero() {
        let fetcher = fetcher(vec![Err("connection refused".to_string())]);

        let response = fetcher.fetch("/anime/1", &RequestOptions::new()).await;

        assert_eq!(response.status, 0);
        assert!(response.data.is_none());
        assert!(response.error.unwrap().contains("connection refused"));
        assert_eq!(fetcher.cache().unwrap().stats().unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_undecodable_body_is_not_cached() {
        let fetcher = fetcher(vec![reply(200, "<html>"), reply(200, "{}")]);

        let first = fetcher.fetch("/anime/1", &RequestOptions::new()).await;
        assert!(first.data.is_none());
        assert!(first.error.unwrap().contains("parse"));

        let second = fetcher.fetch("/anime/1", &RequestOptions::new()).await;
        assert_eq!(second, ApiResponse::ok(json!({}), 200));
        assert_eq!(fetcher.transport().calls(), 2);
    }

    #[tokio::test]
    async fn test_fetch_fresh_bypasses_cache_and_updates_it() {
        let fetcher = fetcher(vec![reply(200, "1"), reply(200, "2")]);
        let options = RequestOptions::new();

        fetcher.fetch("/x", &options).await;
        let fresh = fetcher.fetch_fresh("/x", &options).await;
        let cached = fetcher.fetch("/x", &options).await;

        assert_eq!(fresh, ApiResponse::ok(json!(2), 200));
        assert!(!fresh.from_cache);
        assert_eq!(cached, fresh);
        assert!(cached.from_cache);
        assert_eq!(fetcher.transport().calls(), 2);
    }

    #[tokio::test]
    async fn test_write_failure_still_returns_response() {
        let fetcher = fetcher(vec![reply(200, r#"{"id":5}"#)]);
        fetcher.cache().unwrap().store().set_fail_writes(true);

        let response = fetcher.fetch("/anime/5", &RequestOptions::new()).await;

        assert_eq!(response, ApiResponse::ok(json!({"id": 5}), 200));
        assert_eq!(fetcher.cache().unwrap().stats().unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_uncached_fetcher_always_hits_network() {
        let fetcher: CachedFetcher<_, MemoryStore> =
            CachedFetcher::uncached(ScriptedTransport::new(vec![reply(200, "[]")]));

        fetcher.fetch("/anime/popular", &RequestOptions::new()).await;
        fetcher.fetch("/anime/popular", &RequestOptions::new()).await;

        assert_eq!(fetcher.transport().calls(), 2);
        assert!(fetcher.cache().is_none());
    }
}
