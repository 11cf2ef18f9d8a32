//! Metadata lookup: external id → provider id and canonical title.
//!
//! The default implementation asks TMDB's `/find` endpoint to translate an
//! IMDb id. A missing match is an ordinary outcome, not an error.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::http_client::{FetchRequest, Fetcher};
use crate::request::{MediaId, MediaKind};

const TMDB_API_BASE: &str = "https://api.themoviedb.org/3";

/// Canonical data for one title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaMetadata {
    /// Provider-specific numeric id (TMDB id).
    pub provider_id: String,
    pub title: String,
    /// Four-digit release year, empty when unknown.
    pub year: String,
}

#[async_trait]
pub trait MetadataLookup: Send + Sync {
    /// First matching title for `external_id`, or `None`.
    async fn find(
        &self,
        fetcher: &dyn Fetcher,
        external_id: &str,
        kind: MediaKind,
        api_key: &str,
    ) -> Option<MediaMetadata>;
}

/// TMDB-backed [`MetadataLookup`].
pub struct TmdbLookup {
    api_base: String,
}

impl TmdbLookup {
    #[must_use]
    pub fn new() -> Self {
        Self::with_api_base(TMDB_API_BASE)
    }

    #[must_use]
    pub fn with_api_base(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    async fn fetch_find(
        &self,
        fetcher: &dyn Fetcher,
        base_id: &str,
        api_key: &str,
    ) -> Result<TmdbFindResponse> {
        let url = format!("{}/find/{base_id}", self.api_base);
        let request = FetchRequest::new(url)
            .header("Accept", "application/json")
            .query("api_key", api_key)
            .query("external_source", "imdb_id");

        let response = fetcher.get(request).await?.ensure_success()?;
        serde_json::from_str(&response.body).context("Failed to parse TMDB find response")
    }
}

impl Default for TmdbLookup {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetadataLookup for TmdbLookup {
    async fn find(
        &self,
        fetcher: &dyn Fetcher,
        external_id: &str,
        kind: MediaKind,
        api_key: &str,
    ) -> Option<MediaMetadata> {
        if api_key.is_empty() {
            return None;
        }
        let base_id = MediaId::parse(external_id).base;

        let found = match self.fetch_find(fetcher, &base_id, api_key).await {
            Ok(found) => found,
            Err(e) => {
                warn!("TMDB lookup failed for {base_id}: {e:#}");
                return None;
            }
        };

        let metadata = match kind {
            MediaKind::Movie => found.movie_results.into_iter().next().map(|m| MediaMetadata {
                provider_id: m.id.to_string(),
                title: m.title,
                year: year_of(&m.release_date),
            }),
            MediaKind::Series => found.tv_results.into_iter().next().map(|s| MediaMetadata {
                provider_id: s.id.to_string(),
                title: s.name,
                year: year_of(&s.first_air_date),
            }),
        };

        if metadata.is_none() {
            debug!("No TMDB {kind} result for {base_id}");
        }
        metadata
    }
}

fn year_of(date: &str) -> String {
    date.chars().take(4).collect()
}

// Serde structures for TMDB API responses

#[derive(Debug, Deserialize)]
struct TmdbFindResponse {
    #[serde(default)]
    movie_results: Vec<TmdbMovie>,
    #[serde(default)]
    tv_results: Vec<TmdbShow>,
}

#[derive(Debug, Deserialize)]
struct TmdbMovie {
    id: u64,
    title: String,
    #[serde(default)]
    release_date: String,
}

#[derive(Debug, Deserialize)]
struct TmdbShow {
    id: u64,
    name: String,
    #[serde(default)]
    first_air_date: String,
}
