//! Vilibrity anime catalog client library
//!
//! Exposes the response cache, the HTTP fetch layer and the catalog client
//! used by the `vilibrity` binary and by the integration tests.

pub mod api;
pub mod cache;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod output;
pub mod store;
