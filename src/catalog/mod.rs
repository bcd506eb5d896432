//! Anime catalog data models
//!
//! The backend returns AniList-shaped records (`coverImage`, `meanScore`,
//! `startDate`, ...). This module defines those wire records and the flat
//! [`Anime`] view the rest of the application works with.

mod client;

pub use client::{AnimeClient, CatalogError, HomeFeed};

use serde::{Deserialize, Serialize};

/// Popularity above which a title counts as popular
const POPULARITY_THRESHOLD: u64 = 10_000;

/// Cover art URLs as returned by the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverImage {
    pub large: Option<String>,
    pub medium: Option<String>,
    pub color: Option<String>,
}

/// An anime record as served by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendAnime {
    pub id: u64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub cover_image: Option<CoverImage>,
    pub banner_image: Option<String>,
    /// Average score on a 0-100 scale
    pub mean_score: Option<f64>,
    pub popularity: Option<u64>,
    pub status: Option<String>,
    pub episodes: Option<u32>,
    pub genres: Option<Vec<String>>,
    /// `YYYY-MM-DD`
    pub start_date: Option<String>,
}

/// A genre with the number of titles tagged with it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub name: String,
    #[serde(default)]
    pub count: u64,
}

/// Which listing a record came from; decides the badge flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing {
    Trending,
    Popular,
    /// Genre pages, search results and detail lookups
    Lookup,
}

/// An anime title ready for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anime {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub banner_url: String,
    /// Score on a 0-5 scale with one decimal
    pub rating: f64,
    pub year: i32,
    pub genres: Vec<String>,
    pub episodes: Option<u32>,
    pub is_recommended: bool,
    pub is_popular: bool,
    pub is_trending: bool,
    pub views_count: u64,
    pub status: String,
}

impl Anime {
    /// Builds the display record from a backend record
    ///
    /// `current_year` stands in for a missing or malformed start date.
    pub fn from_backend(record: BackendAnime, listing: Listing, current_year: i32) -> Self {
        let cover = record.cover_image.unwrap_or_default();
        let cover_url = cover.large.or(cover.medium);
        let title = record.title.unwrap_or_else(|| "Unknown".to_string());
        let popularity = record.popularity.unwrap_or(0);

        Self {
            id: record.id.to_string(),
            title,
            description: record.description.unwrap_or_default(),
            image_url: cover_url.clone().unwrap_or_default(),
            banner_url: record.banner_image.or(cover_url).unwrap_or_default(),
            rating: convert_rating(record.mean_score),
            year: record
                .start_date
                .as_deref()
                .and_then(parse_year)
                .unwrap_or(current_year),
            genres: record.genres.unwrap_or_default(),
            episodes: record.episodes,
            is_recommended: false,
            is_popular: listing == Listing::Popular || popularity > POPULARITY_THRESHOLD,
            is_trending: listing == Listing::Trending,
            views_count: popularity,
            status: record.status.unwrap_or_else(|| "UNKNOWN".to_string()),
        }
    }
}

/// Maps a 0-100 score onto 0-5, rounded to one decimal
pub fn convert_rating(score: Option<f64>) -> f64 {
    match score {
        Some(score) if score > 0.0 => (score / 100.0 * 5.0 * 10.0).round() / 10.0,
        _ => 0.0,
    }
}

fn parse_year(date: &str) -> Option<i32> {
    date.split('-').next()?.trim().parse().ok()
}
