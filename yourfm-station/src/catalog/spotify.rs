//! Spotify Web API catalog client
//!
//! Bearer-token client for the artist, search and top-track endpoints.
//! Requests from one client are spaced by a small minimum interval, and a
//! single `429 Too Many Requests` is retried after its `Retry-After` delay.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use yourfm_common::config::SpotifyConfig;

use super::{skip_nulls, CatalogArtist, CatalogClient, CatalogConnector, CatalogError, CatalogTrack};

const USER_AGENT: &str = "YourFM/0.1.0";

/// Spotify rejects search pages larger than this
const MAX_SEARCH_LIMIT: usize = 50;

/// Longest `Retry-After` we are willing to sleep through
const MAX_RETRY_AFTER: Duration = Duration::from_secs(5);

/// Rate limiter enforcing a minimum interval between requests
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    /// Wait if necessary to comply with rate limit
    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::trace!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

#[derive(Debug, Deserialize)]
struct Paging<T> {
    #[serde(default = "Vec::new", deserialize_with = "skip_nulls", bound(deserialize = "T: Deserialize<'de>"))]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ArtistSearchResponse {
    artists: Paging<CatalogArtist>,
}

#[derive(Debug, Deserialize)]
struct TrackSearchResponse {
    tracks: Paging<CatalogTrack>,
}

#[derive(Debug, Deserialize)]
struct TopTracksResponse {
    #[serde(default, deserialize_with = "skip_nulls")]
    tracks: Vec<CatalogTrack>,
}

/// Build the `q` parameter of a genre-scoped search
pub(crate) fn genre_query(genre: &str) -> String {
    format!("genre:\"{}\"", genre.trim())
}

/// Build the `q` parameter of a free-text artist search
pub(crate) fn artist_query(query: &str, genre: Option<&str>) -> String {
    match genre.map(str::trim).filter(|g| !g.is_empty()) {
        Some(genre) => format!("{} genre:{}", query.trim(), genre),
        None => query.trim().to_string(),
    }
}

/// Path under `/artists`, refusing anything that is not a base62 Spotify id
fn artist_path(artist_id: &str, suffix: &str) -> Result<String, CatalogError> {
    if artist_id.is_empty() || !artist_id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(CatalogError::NotFound(format!("artist {:?}", artist_id)));
    }
    Ok(format!("/artists/{}{}", artist_id, suffix))
}

fn clamp_limit(limit: usize) -> usize {
    limit.clamp(1, MAX_SEARCH_LIMIT)
}

/// Spotify catalog client bound to one access token
pub struct SpotifyCatalog {
    http_client: reqwest::Client,
    base_url: String,
    market: String,
    access_token: String,
    rate_limiter: RateLimiter,
}

impl SpotifyCatalog {
    pub fn new(
        http_client: reqwest::Client,
        config: &SpotifyConfig,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            market: config.market.clone(),
            access_token: access_token.into(),
            rate_limiter: RateLimiter::new(config.min_request_interval_ms),
        }
    }

    /// GET `path` with query parameters and decode the JSON body
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, CatalogError> {
        let url = format!("{}{}", self.base_url, path);
        let mut retried = false;

        loop {
            self.rate_limiter.wait().await;

            tracing::debug!(url = %url, "Querying Spotify Web API");

            let response = self
                .http_client
                .get(&url)
                .bearer_auth(&self.access_token)
                .query(query)
                .send()
                .await
                .map_err(|e| CatalogError::Network(e.to_string()))?;

            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after_secs = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok());

                let delay = Duration::from_secs(retry_after_secs.unwrap_or(1));
                if !retried && delay <= MAX_RETRY_AFTER {
                    tracing::warn!(url = %url, "Spotify rate limit hit, retrying in {:?}", delay);
                    retried = true;
                    tokio::time::sleep(delay).await;
                    continue;
                }
                return Err(CatalogError::RateLimited { retry_after_secs });
            }

            if status == StatusCode::UNAUTHORIZED {
                return Err(CatalogError::Unauthenticated);
            }

            if status == StatusCode::NOT_FOUND {
                return Err(CatalogError::NotFound(path.to_string()));
            }

            if !status.is_success() {
                let error_text = response.text().await.unwrap_or_default();
                return Err(CatalogError::Api(status.as_u16(), error_text));
            }

            return response
                .json::<T>()
                .await
                .map_err(|e| CatalogError::Parse(e.to_string()));
        }
    }
}

#[async_trait]
impl CatalogClient for SpotifyCatalog {
    async fn artist(&self, artist_id: &str) -> Result<CatalogArtist, CatalogError> {
        self.get_json(&artist_path(artist_id, "")?, &[]).await
    }

    async fn search_artists(
        &self,
        query: &str,
        genre: Option<&str>,
        limit: usize,
    ) -> Result<Vec<CatalogArtist>, CatalogError> {
        let response: ArtistSearchResponse = self
            .get_json(
                "/search",
                &[
                    ("q", artist_query(query, genre)),
                    ("type", "artist".to_string()),
                    ("limit", clamp_limit(limit).to_string()),
                ],
            )
            .await?;
        Ok(response.artists.items)
    }

    async fn search_artists_by_genre(
        &self,
        genre: &str,
        limit: usize,
    ) -> Result<Vec<CatalogArtist>, CatalogError> {
        let response: ArtistSearchResponse = self
            .get_json(
                "/search",
                &[
                    ("q", genre_query(genre)),
                    ("type", "artist".to_string()),
                    ("limit", clamp_limit(limit).to_string()),
                ],
            )
            .await?;
        Ok(response.artists.items)
    }

    async fn search_tracks_by_genre(
        &self,
        genre: &str,
        limit: usize,
    ) -> Result<Vec<CatalogTrack>, CatalogError> {
        let response: TrackSearchResponse = self
            .get_json(
                "/search",
                &[
                    ("q", genre_query(genre)),
                    ("type", "track".to_string()),
                    ("limit", clamp_limit(limit).to_string()),
                ],
            )
            .await?;
        Ok(response.tracks.items)
    }

    async fn top_tracks(&self, artist_id: &str) -> Result<Vec<CatalogTrack>, CatalogError> {
        let response: TopTracksResponse = self
            .get_json(
                &artist_path(artist_id, "/top-tracks")?,
                &[("market", self.market.clone())],
            )
            .await?;
        Ok(response.tracks)
    }
}

/// Creates [`SpotifyCatalog`] clients sharing one HTTP connection pool
#[derive(Clone)]
pub struct SpotifyConnector {
    http_client: reqwest::Client,
    config: SpotifyConfig,
}

impl SpotifyConnector {
    pub fn new(config: SpotifyConfig) -> Result<Self, CatalogError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            config,
        })
    }
}

impl CatalogConnector for SpotifyConnector {
    fn connect(&self, access_token: &str) -> Arc<dyn CatalogClient> {
        Arc::new(SpotifyCatalog::new(
            self.http_client.clone(),
            &self.config,
            access_token,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genre_query_quotes_genre() {
        assert_eq!(genre_query(" indie rock "), "genre:\"indie rock\"");
    }

    #[test]
    fn test_artist_query_with_and_without_genre() {
        assert_eq!(artist_query("radiohead", None), "radiohead");
        assert_eq!(artist_query("radiohead", Some("rock")), "radiohead genre:rock");
        assert_eq!(artist_query("radiohead", Some("  ")), "radiohead");
    }

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(0), 1);
        assert_eq!(clamp_limit(20), 20);
        assert_eq!(clamp_limit(500), MAX_SEARCH_LIMIT);
    }

    #[test]
    fn test_parse_artist_search_response() {
        let body = r#"{
            "artists": {
                "href": "https://api.spotify.com/v1/search",
                "items": [
                    {
                        "id": "4Z8W4fKeB5YxbusRsdQVPb",
                        "name": "Radiohead",
                        "genres": ["alternative rock", "art rock"],
                        "popularity": 79,
                        "images": [{"url": "https://i.scdn.co/image/a", "height": 640, "width": 640}]
                    },
                    {"id": "x", "name": "No Metadata"}
                ]
            }
        }"#;

        let parsed: ArtistSearchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.artists.items.len(), 2);
        assert_eq!(parsed.artists.items[0].genres.len(), 2);
        assert_eq!(parsed.artists.items[0].image_url(), Some("https://i.scdn.co/image/a"));
        assert!(parsed.artists.items[1].genres.is_empty());
        assert_eq!(parsed.artists.items[1].popularity, 0);
    }

    #[test]
    fn test_parse_top_tracks_response() {
        let body = r#"{
            "tracks": [
                {
                    "uri": "spotify:track:1",
                    "name": "Karma Police",
                    "artists": [{"id": "4Z8W4fKeB5YxbusRsdQVPb", "name": "Radiohead"}],
                    "album": {"name": "OK Computer", "images": []},
                    "duration_ms": 264066,
                    "preview_url": null
                }
            ]
        }"#;

        let parsed: TopTracksResponse = serde_json::from_str(body).unwrap();
        let track = &parsed.tracks[0];
        assert_eq!(track.primary_artist().map(|a| a.name.as_str()), Some("Radiohead"));
        assert_eq!(track.album.name, "OK Computer");
        assert_eq!(track.duration_ms, 264066);
        assert!(track.preview_url.is_none());
    }

    #[test]
    fn test_artist_path_rejects_non_base62_ids() {
        assert_eq!(
            artist_path("4Z8W4fKeB5YxbusRsdQVPb", "/top-tracks").unwrap(),
            "/artists/4Z8W4fKeB5YxbusRsdQVPb/top-tracks"
        );
        for bad in ["", "../me", "a/b", "abc?market=US", "id with space", "caf\u{e9}"] {
            assert!(
                matches!(artist_path(bad, ""), Err(CatalogError::NotFound(_))),
                "accepted {:?}",
                bad
            );
        }
    }

    #[tokio::test]
    async fn test_unsafe_artist_id_never_reaches_the_network() {
        let config = SpotifyConfig {
            api_base_url: "http://127.0.0.1:9".to_string(),
            ..SpotifyConfig::default()
        };
        let connector = SpotifyConnector::new(config).unwrap();
        let client = connector.connect("token");

        assert!(matches!(client.artist("../me").await, Err(CatalogError::NotFound(_))));
        assert!(matches!(client.top_tracks("x/y").await, Err(CatalogError::NotFound(_))));
    }

    #[test]
    fn test_null_items_and_null_artist_ids_are_tolerated() {
        let body = r#"{
            "tracks": {
                "items": [
                    null,
                    {
                        "uri": "spotify:local:Band:Album:Song:200",
                        "name": "Song",
                        "artists": [{"id": null, "name": "Band"}, null],
                        "album": null,
                        "duration_ms": null
                    }
                ]
            }
        }"#;

        let parsed: TrackSearchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.tracks.items.len(), 1);
        let track = &parsed.tracks.items[0];
        assert_eq!(track.artists.len(), 1);
        assert_eq!(track.artists[0].id, "");
        assert_eq!(track.artists[0].name, "Band");
        assert_eq!(track.album.name, "");
        assert_eq!(track.duration_ms, 0);

        let empty: ArtistSearchResponse =
            serde_json::from_str(r#"{"artists": {"items": null}}"#).unwrap();
        assert!(empty.artists.items.is_empty());

        let top: TopTracksResponse = serde_json::from_str(r#"{"tracks": [null]}"#).unwrap();
        assert!(top.tracks.is_empty());
    }

    #[tokio::test]
    async fn test_rate_limiter_spacing() {
        let limiter = RateLimiter::new(100);
        let start = Instant::now();
        limiter.wait().await;
        limiter.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(90));
    }
}
