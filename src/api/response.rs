//! Result record returned by every fetch

use serde::{Deserialize, Serialize};

/// Outcome of a single API request
///
/// Exactly one of `data` and `error` is set. `status` is the HTTP status of
/// the response, or `0` when no response was received at all.
///
/// `from_cache` marks answers served from the response cache. It is never
/// persisted and does not take part in equality: a cached answer equals the
/// network answer it was stored from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: Option<T>,
    pub error: Option<String>,
    pub status: u16,
    #[serde(skip)]
    pub from_cache: bool,
}

impl<T: PartialEq> PartialEq for ApiResponse<T> {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data && self.error == other.error && self.status == other.status
    }
}

impl<T> ApiResponse<T> {
    /// A decoded response body
    pub fn ok(data: T, status: u16) -> Self {
        Self {
            data: Some(data),
            error: None,
            status,
            from_cache: false,
        }
    }

    /// A failed request
    pub fn failure(error: impl Into<String>, status: u16) -> Self {
        Self {
            data: None,
            error: Some(error.into()),
            status,
            from_cache: false,
        }
    }

    /// Whether the request succeeded with a 2xx status and a decoded body
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status) && self.error.is_none() && self.data.is_some()
    }
}
