//! Raw HTTP transport
//!
//! Issues GET requests against the catalog backend and hands back the
//! status code and body text untouched. Decoding and caching happen one
//! layer up, in the fetcher.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

use crate::cache::RequestOptions;

/// Errors that prevent a request from producing any response
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// The backend could not be reached
    #[error("Backend unreachable: {0}")]
    Unreachable(String),
}

/// Status and body of a completed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Performs GET requests against the backend
#[async_trait]
pub trait Transport: Send + Sync {
    /// Requests `endpoint` with `options` as query parameters
    async fn get(
        &self,
        endpoint: &str,
        options: &RequestOptions,
    ) -> Result<TransportResponse, TransportError>;
}

/// Transport backed by a reqwest client
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// Creates a transport for `base_url` with a per-request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Creates a transport with a custom HTTP client
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// Base URL requests are resolved against
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(
        &self,
        endpoint: &str,
        options: &RequestOptions,
    ) -> Result<TransportResponse, TransportError> {
        let query: Vec<(&str, &str)> = options.iter().collect();
        let response = self
            .client
            .get(self.url_for(endpoint))
            .query(&query)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(TransportResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_base_and_endpoint_with_one_slash() {
        let transport = HttpTransport::with_client(Client::new(), "http://localhost:8000/api/v1/");
        assert_eq!(transport.base_url(), "http://localhost:8000/api/v1");
        assert_eq!(
            transport.url_for("/anime/trending"),
            "http://localhost:8000/api/v1/anime/trending"
        );
        assert_eq!(
            transport.url_for("anime/42"),
            "http://localhost:8000/api/v1/anime/42"
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_is_an_error() {
        let transport =
            HttpTransport::new("http://127.0.0.1:1", Duration::from_secs(2)).expect("client builds");
        let result = transport.get("/anime/trending", &RequestOptions::new()).await;
        assert!(matches!(result, Err(TransportError::RequestFailed(_))));
    }
}
