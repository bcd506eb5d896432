//! HTTP access to the catalog backend
//!
//! A [`Transport`] performs the raw request; a [`CachedFetcher`] puts the
//! response cache in front of it and turns every outcome into an
//! [`ApiResponse`] record.

mod fetcher;
mod response;
mod transport;

pub use fetcher::CachedFetcher;
pub use response::ApiResponse;
pub use transport::{HttpTransport, Transport, TransportError, TransportResponse};
