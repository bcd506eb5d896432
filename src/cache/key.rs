//! Cache key derivation

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::json;

/// Query parameters of a logical request
///
/// Parameters are kept sorted by name, so the order in which they are added
/// never changes the derived cache key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RequestOptions {
    params: BTreeMap<String, String>,
}

impl RequestOptions {
    /// Creates an empty set of options
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a query parameter
    pub fn param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.params.insert(name.into(), value.to_string());
        self
    }

    /// Whether no parameters are set
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Parameters in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Derives the cache key for a request to `endpoint` with `options`
///
/// The key is the JSON array `[endpoint, {params}]`. JSON string escaping
/// makes the encoding injective: two requests share a key only when both
/// the endpoint and every parameter match.
pub fn cache_key(endpoint: &str, options: &RequestOptions) -> String {
    json!([endpoint, options]).to_string()
}
