//! Music catalog access
//!
//! The mixer and the HTTP handlers only see the [`CatalogClient`] trait.
//! A [`CatalogConnector`] turns an access token into a client for the span of
//! one request, so tests can substitute an in-memory catalog.

pub mod oauth;
pub mod spotify;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use thiserror::Error;

pub use oauth::{SpotifyOAuth, TokenGrant};
pub use spotify::{SpotifyCatalog, SpotifyConnector};

/// Catalog client errors
#[derive(Debug, Error)]
pub enum CatalogError {
    /// No usable access token, or the upstream rejected it (401)
    #[error("Not authenticated with the catalog service")]
    Unauthenticated,

    #[error("Rate limit exceeded")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Request timed out")]
    Timeout,
}

impl CatalogError {
    /// Authentication failures abort a whole request instead of one item
    pub fn is_auth(&self) -> bool {
        matches!(self, CatalogError::Unauthenticated)
    }
}

/// Treat an explicit `null` like a missing field
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// List that tolerates `null` for itself and for any of its entries
pub(crate) fn skip_nulls<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let items: Option<Vec<Option<T>>> = Option::deserialize(deserializer)?;
    Ok(items.unwrap_or_default().into_iter().flatten().collect())
}

/// Artwork reference
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CatalogImage {
    pub url: String,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub width: Option<u32>,
}

/// Full artist object (search results and artist lookups)
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CatalogArtist {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "skip_nulls")]
    pub genres: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub popularity: u32,
    #[serde(default, deserialize_with = "skip_nulls")]
    pub images: Vec<CatalogImage>,
}

impl CatalogArtist {
    /// First (largest) image URL
    pub fn image_url(&self) -> Option<&str> {
        self.images.first().map(|i| i.url.as_str())
    }
}

/// Simplified artist object embedded in tracks
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ArtistRef {
    /// Empty for local files, which Spotify reports with a `null` id
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    pub name: String,
}

/// Album summary embedded in tracks
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct CatalogAlbum {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "skip_nulls")]
    pub images: Vec<CatalogImage>,
}

/// Track object
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CatalogTrack {
    pub uri: String,
    pub name: String,
    #[serde(default, deserialize_with = "skip_nulls")]
    pub artists: Vec<ArtistRef>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub album: CatalogAlbum,
    #[serde(default, deserialize_with = "null_as_default")]
    pub duration_ms: u64,
    #[serde(default)]
    pub preview_url: Option<String>,
}

impl CatalogTrack {
    /// Credited primary artist
    pub fn primary_artist(&self) -> Option<&ArtistRef> {
        self.artists.first()
    }
}

/// Read access to a music catalog
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Look up one artist by id
    async fn artist(&self, artist_id: &str) -> Result<CatalogArtist, CatalogError>;

    /// Free-text artist search, optionally scoped to a genre
    async fn search_artists(
        &self,
        query: &str,
        genre: Option<&str>,
        limit: usize,
    ) -> Result<Vec<CatalogArtist>, CatalogError>;

    /// Artists tagged with `genre`
    async fn search_artists_by_genre(
        &self,
        genre: &str,
        limit: usize,
    ) -> Result<Vec<CatalogArtist>, CatalogError>;

    /// Tracks whose artists are tagged with `genre`
    async fn search_tracks_by_genre(
        &self,
        genre: &str,
        limit: usize,
    ) -> Result<Vec<CatalogTrack>, CatalogError>;

    /// An artist's most popular tracks
    async fn top_tracks(&self, artist_id: &str) -> Result<Vec<CatalogTrack>, CatalogError>;
}

/// Builds a catalog client bound to one access token
pub trait CatalogConnector: Send + Sync {
    fn connect(&self, access_token: &str) -> Arc<dyn CatalogClient>;
}
