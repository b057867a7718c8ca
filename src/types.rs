//! Provider response types
//!
//! Serde mirrors of the metadata provider's JSON. Movie and tv payloads
//! name the same concepts differently (`title`/`name`,
//! `release_date`/`first_air_date`); aliases fold both onto one struct.

use serde::{Deserialize, Serialize};

/// Media classification for search and details routes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Tv,
}

impl MediaType {
    /// Route segment used by the provider
    pub fn as_path_segment(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Tv => "tv",
        }
    }
}

/// Search response envelope
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchResult>,
}

/// One search hit
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchResult {
    /// Provider id, used for the details lookup
    pub id: i64,
    /// Display title (`name` for tv)
    #[serde(alias = "name")]
    pub title: String,
    /// First release date, YYYY-MM-DD (`first_air_date` for tv)
    #[serde(alias = "first_air_date")]
    pub release_date: Option<String>,
    /// Short synopsis
    pub overview: Option<String>,
    /// Provider popularity score, used by the fuzzy matcher upstream
    pub popularity: Option<f64>,
}

impl SearchResult {
    /// Release year, when the provider supplied a parseable date.
    pub fn year(&self) -> Option<u16> {
        self.release_date
            .as_deref()
            .and_then(|d| d.get(0..4))
            .and_then(|y| y.parse().ok())
    }
}

/// Full details for one title
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MediaDetails {
    pub id: i64,
    #[serde(alias = "name")]
    pub title: String,
    #[serde(alias = "first_air_date")]
    pub release_date: Option<String>,
    pub overview: Option<String>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    /// Runtime in minutes; absent for tv series
    pub runtime: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}
