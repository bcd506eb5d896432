//! Catalog client for the anime backend
//!
//! Wraps a [`CachedFetcher`] with one method per backend listing and turns
//! the raw JSON into [`Anime`] and [`Genre`] records.

use chrono::{Datelike, Local};
use log::{error, info, warn};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use super::{Anime, BackendAnime, Genre, Listing};
use crate::api::{ApiResponse, CachedFetcher, Transport};
use crate::cache::{Clock, RequestOptions, SystemClock};
use crate::store::KeyValueStore;

/// Characters that would end or rewrite a URL path segment
const PATH_RESERVED: &[char] = &['/', '\\', '?', '#', '%'];

/// Errors that can occur when loading catalog data
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The backend could not be reached or answered with an error
    #[error("{message}")]
    Api { status: u16, message: String },

    /// The response did not have the expected shape
    #[error("Unexpected response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },

    /// The listing exists but holds nothing
    #[error("No anime data in response from {0}")]
    Empty(String),

    /// The request was rejected before reaching the backend
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Everything the home feed shows, loaded in one go
///
/// Each section fails independently.
#[derive(Debug)]
pub struct HomeFeed {
    pub banner: Option<Anime>,
    pub trending: Result<Vec<Anime>, CatalogError>,
    pub popular: Result<Vec<Anime>, CatalogError>,
    pub genres: Result<Vec<Genre>, CatalogError>,
}

/// Client for the anime catalog endpoints
pub struct AnimeClient<T, S, C = SystemClock> {
    fetcher: CachedFetcher<T, S, C>,
    /// Skip cache reads (responses are still written back)
    refresh: bool,
}

impl<T, S, C> AnimeClient<T, S, C>
where
    T: Transport,
    S: KeyValueStore,
    C: Clock,
{
    /// Creates a client on top of `fetcher`
    pub fn new(fetcher: CachedFetcher<T, S, C>) -> Self {
        Self {
            fetcher,
            refresh: false,
        }
    }

    /// Makes every request bypass cached entries
    pub fn with_refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    /// The fetcher behind this client
    pub fn fetcher(&self) -> &CachedFetcher<T, S, C> {
        &self.fetcher
    }

    /// Currently trending titles
    pub async fn trending(&self, page: u32) -> Result<Vec<Anime>, CatalogError> {
        let endpoint = "/anime/trending";
        let body = self
            .get(endpoint, RequestOptions::new().param("page", page.max(1)))
            .await?;
        let items = field(&body, "trending", endpoint)?;
        Ok(to_anime(decode_list(items, endpoint), Listing::Trending))
    }

    /// Most popular titles of all time
    pub async fn popular(&self, page: u32) -> Result<Vec<Anime>, CatalogError> {
        let endpoint = "/anime/popular";
        let body = self
            .get(endpoint, RequestOptions::new().param("page", page.max(1)))
            .await?;
        Ok(to_anime(decode_list(&body, endpoint), Listing::Popular))
    }

    /// Genres ranked by number of titles
    pub async fn popular_genres(&self) -> Result<Vec<Genre>, CatalogError> {
        let endpoint = "/anime/genres/popular";
        let body = self.get(endpoint, RequestOptions::new()).await?;
        Ok(decode_list(&body, endpoint))
    }

    /// Titles tagged with `genre`
    pub async fn by_genre(&self, genre: &str) -> Result<Vec<Anime>, CatalogError> {
        let genre = genre.trim();
        if genre.is_empty()
            || genre.contains(PATH_RESERVED)
            || genre.chars().all(|c| c == '.')
        {
            return Err(CatalogError::InvalidInput(format!(
                "'{}' is not a genre name",
                genre
            )));
        }

        let endpoint = format!("/anime/genre/{}", genre);
        let body = self.get(&endpoint, RequestOptions::new()).await?;
        let items = field(&body, "data", &endpoint)?;
        Ok(to_anime(decode_list(items, &endpoint), Listing::Lookup))
    }

    /// Titles matching a free-text query
    pub async fn search(&self, query: &str) -> Result<Vec<Anime>, CatalogError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(CatalogError::InvalidInput(
                "search query is empty".to_string(),
            ));
        }

        let endpoint = "/anime/search";
        let body = self
            .get(endpoint, RequestOptions::new().param("query", query))
            .await?;
        let items = field(&body, "data", endpoint)?;
        Ok(to_anime(decode_list(items, endpoint), Listing::Lookup))
    }

    /// A single title by its numeric id
    pub async fn anime_by_id(&self, id: &str) -> Result<Anime, CatalogError> {
        let numeric_id = match id.trim().parse::<u64>() {
            Ok(n) if n > 0 => n,
            _ => {
                return Err(CatalogError::InvalidInput(format!(
                    "'{}' is not a valid anime id",
                    id
                )))
            }
        };

        let endpoint = format!("/anime/{}", numeric_id);
        let body = self.get(&endpoint, RequestOptions::new()).await?;
        let record: BackendAnime =
            serde_json::from_value(body).map_err(|e| CatalogError::Decode {
                endpoint: endpoint.clone(),
                reason: e.to_string(),
            })?;
        Ok(Anime::from_backend(record, Listing::Lookup, current_year()))
    }

    /// The title featured at the top of the home feed
    pub async fn banner(&self) -> Result<Anime, CatalogError> {
        let trending = self.trending(1).await?;
        pick_banner(&trending).ok_or_else(|| CatalogError::Empty("/anime/trending".to_string()))
    }

    /// Loads trending, popular and genre listings concurrently
    pub async fn home(&self) -> HomeFeed {
        let (trending, popular, genres) =
            futures::join!(self.trending(1), self.popular(1), self.popular_genres());
        let banner = trending.as_ref().ok().and_then(|list| pick_banner(list));

        HomeFeed {
            banner,
            trending,
            popular,
            genres,
        }
    }

    async fn get(&self, endpoint: &str, options: RequestOptions) -> Result<Value, CatalogError> {
        let response = if self.refresh {
            self.fetcher.fetch_fresh(endpoint, &options).await
        } else {
            self.fetcher.fetch(endpoint, &options).await
        };
        if response.from_cache {
            info!("{} served from cache", endpoint);
        }
        into_data(endpoint, response)
    }
}

fn into_data(endpoint: &str, response: ApiResponse<Value>) -> Result<Value, CatalogError> {
    match response {
        ApiResponse {
            data: Some(data),
            error: None,
            ..
        } => Ok(data),
        ApiResponse { error, status, .. } => {
            let message = error.unwrap_or_else(|| format!("Empty response from {}", endpoint));
            error!("Error fetching {}: {}", endpoint, message);
            Err(CatalogError::Api { status, message })
        }
    }
}

fn field<'a>(body: &'a Value, name: &str, endpoint: &str) -> Result<&'a Value, CatalogError> {
    body.get(name).ok_or_else(|| CatalogError::Decode {
        endpoint: endpoint.to_string(),
        reason: format!("missing field `{}`", name),
    })
}

/// Decodes every element of a JSON array, skipping the ones that don't fit
fn decode_list<D: DeserializeOwned>(items: &Value, endpoint: &str) -> Vec<D> {
    let Some(items) = items.as_array() else {
        warn!("Expected a list from {}, got {}", endpoint, items);
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match D::deserialize(item) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!("Skipping malformed record from {}: {}", endpoint, e);
                None
            }
        })
        .collect()
}

fn to_anime(records: Vec<BackendAnime>, listing: Listing) -> Vec<Anime> {
    let year = current_year();
    records
        .into_iter()
        .map(|record| Anime::from_backend(record, listing, year))
        .collect()
}

fn pick_banner(trending: &[Anime]) -> Option<Anime> {
    trending.first().cloned().map(|mut anime| {
        anime.is_recommended = true;
        anime
    })
}

fn current_year() -> i32 {
    Local::now().year()
}
