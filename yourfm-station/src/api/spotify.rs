//! Spotify OAuth and catalog browsing endpoints

use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{info, warn};

use super::auth::{access_token, catalog_client};
use crate::catalog::{CatalogArtist, CatalogClient, CatalogError};
use crate::db::{self, DEFAULT_USER_ID};
use crate::mixer::{normalize_genre, genre_rules::substring_match};
use crate::{ApiError, ApiResult, AppState};

/// Genres offered in the station editor
pub const STATION_GENRES: [&str; 18] = [
    "pop", "rock", "hip-hop", "jazz", "classical", "electronic",
    "country", "r-n-b", "indie", "metal", "folk", "blues",
    "reggae", "latin", "alternative", "dance", "soul", "funk",
];

const ARTIST_SEARCH_LIMIT: usize = 20;
const BROWSE_GENRE_LIMIT: usize = 3;
const BROWSE_TRACKS_PER_GENRE: usize = 10;
const BROWSE_RESULT_LIMIT: usize = 12;
const BROWSE_LOOKUP_CONCURRENCY: usize = 4;

#[derive(Debug, Serialize)]
pub struct AuthUrlResponse {
    pub auth_url: String,
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
}

#[derive(Debug, Serialize)]
pub struct GenresResponse {
    pub genres: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ArtistSearchParams {
    pub query: String,
    pub genre: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ByGenreParams {
    /// Comma-separated genre list
    pub genres: String,
}

/// Artist as shown in the station editor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtistSummary {
    pub id: String,
    pub name: String,
    pub image: Option<String>,
    pub genres: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub popularity: Option<u32>,
}

impl ArtistSummary {
    fn from_catalog(artist: &CatalogArtist, with_popularity: bool) -> Self {
        Self {
            id: artist.id.clone(),
            name: artist.name.clone(),
            image: artist.image_url().map(str::to_string),
            genres: artist.genres.clone(),
            popularity: with_popularity.then_some(artist.popularity),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ArtistsResponse {
    pub artists: Vec<ArtistSummary>,
}

/// GET /api/spotify/auth
pub async fn spotify_auth(State(state): State<AppState>) -> ApiResult<Json<AuthUrlResponse>> {
    let oauth = state
        .oauth
        .as_ref()
        .ok_or_else(|| ApiError::NotConfigured("Spotify credentials not configured".to_string()))?;

    Ok(Json(AuthUrlResponse {
        auth_url: oauth.authorize_url()?,
    }))
}

/// GET /api/spotify/callback?code=...
///
/// Stores the granted tokens and sends the browser back to the frontend.
pub async fn spotify_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> ApiResult<Redirect> {
    let oauth = state
        .oauth
        .as_ref()
        .ok_or_else(|| ApiError::NotConfigured("Spotify credentials not configured".to_string()))?;

    if let Some(error) = params.error {
        warn!("Spotify authorization denied: {}", error);
        return Err(ApiError::BadRequest(format!("Spotify authorization failed: {}", error)));
    }
    let code = params
        .code
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing authorization code".to_string()))?;

    let grant = oauth.exchange_code(&code).await?;
    db::tokens::save_token(&state.db, DEFAULT_USER_ID, &grant).await?;
    info!("Spotify account connected");

    Ok(Redirect::to(&format!(
        "{}/?spotify_auth=success",
        state.frontend_url.trim_end_matches('/')
    )))
}

/// GET /api/spotify/token
pub async fn spotify_token(State(state): State<AppState>) -> ApiResult<Json<TokenResponse>> {
    if db::tokens::load_token(&state.db, DEFAULT_USER_ID).await?.is_none() {
        return Err(ApiError::NotFound(
            "No token found. Please authenticate with Spotify.".to_string(),
        ));
    }

    Ok(Json(TokenResponse {
        access_token: access_token(&state).await?,
    }))
}

/// GET /api/spotify/genres
pub async fn spotify_genres() -> Json<GenresResponse> {
    Json(GenresResponse {
        genres: STATION_GENRES.iter().map(|g| g.to_string()).collect(),
    })
}

/// POST /api/spotify/search/artists?query=...&genre=...
pub async fn search_artists(
    State(state): State<AppState>,
    Query(params): Query<ArtistSearchParams>,
) -> ApiResult<Json<ArtistsResponse>> {
    if params.query.trim().is_empty() {
        return Err(ApiError::BadRequest("query must not be empty".to_string()));
    }

    let catalog = catalog_client(&state).await?;
    let artists = catalog
        .search_artists(&params.query, params.genre.as_deref(), ARTIST_SEARCH_LIMIT)
        .await?;

    Ok(Json(ArtistsResponse {
        artists: artists
            .iter()
            .map(|a| ArtistSummary::from_catalog(a, false))
            .collect(),
    }))
}

/// Popular artists for up to three genres, found through genre track search
pub async fn browse_artists_by_genre(
    catalog: &dyn CatalogClient,
    genres: &[String],
) -> Result<Vec<ArtistSummary>, CatalogError> {
    let mut seen = HashSet::new();
    let mut found = Vec::new();

    for genre in genres.iter().take(BROWSE_GENRE_LIMIT) {
        let tracks = match catalog
            .search_tracks_by_genre(genre, BROWSE_TRACKS_PER_GENRE)
            .await
        {
            Ok(tracks) => tracks,
            Err(e) if e.is_auth() => return Err(e),
            Err(e) => {
                warn!(genre = %genre, "Genre track search failed: {}", e);
                continue;
            }
        };

        let ids: Vec<String> = tracks
            .iter()
            .flat_map(|t| t.artists.iter())
            .filter(|a| !a.id.is_empty() && seen.insert(a.id.clone()))
            .map(|a| a.id.clone())
            .collect();

        let lookups: Vec<Result<CatalogArtist, CatalogError>> = stream::iter(ids)
            .map(|id| async move { catalog.artist(&id).await })
            .buffered(BROWSE_LOOKUP_CONCURRENCY)
            .collect()
            .await;

        let wanted = normalize_genre(genre);
        for lookup in lookups {
            let artist = match lookup {
                Ok(artist) => artist,
                Err(e) if e.is_auth() => return Err(e),
                Err(_) => continue,
            };
            let matches = artist
                .genres
                .iter()
                .any(|g| substring_match(&normalize_genre(g), &wanted));
            if matches {
                found.push(ArtistSummary::from_catalog(&artist, true));
            }
        }
    }

    found.sort_by(|a, b| b.popularity.cmp(&a.popularity));
    found.truncate(BROWSE_RESULT_LIMIT);
    Ok(found)
}

/// GET /api/spotify/artists/by-genre?genres=a,b
pub async fn artists_by_genre(
    State(state): State<AppState>,
    Query(params): Query<ByGenreParams>,
) -> ApiResult<Json<ArtistsResponse>> {
    let genres: Vec<String> = params
        .genres
        .split(',')
        .map(|g| g.trim().to_string())
        .filter(|g| !g.is_empty())
        .collect();
    if genres.is_empty() {
        return Err(ApiError::BadRequest("genres must not be empty".to_string()));
    }

    let catalog = catalog_client(&state).await?;
    let artists = browse_artists_by_genre(catalog.as_ref(), &genres).await?;

    Ok(Json(ArtistsResponse { artists }))
}

/// Build Spotify routes
pub fn spotify_routes() -> Router<AppState> {
    Router::new()
        .route("/api/spotify/auth", get(spotify_auth))
        .route("/api/spotify/callback", get(spotify_callback))
        .route("/api/spotify/token", get(spotify_token))
        .route("/api/spotify/genres", get(spotify_genres))
        .route("/api/spotify/search/artists", post(search_artists))
        .route("/api/spotify/artists/by-genre", get(artists_by_genre))
}
