//! Track analysis endpoint backed by SoundStat
//!
//! The lookup is fail-soft: any upstream problem, a missing API key, or a
//! track SoundStat does not know yields the neutral defaults instead of an
//! error, so the player can always render its tempo and energy meters.

use async_trait::async_trait;
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use yourfm_common::config::SoundStatConfig;

use crate::AppState;

const DEFAULT_TEMPO: f64 = 120.0;
const DEFAULT_ENERGY: u32 = 60;
const DEFAULT_DANCEABILITY: u32 = 60;

/// Track analysis errors
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("SoundStat API key not configured")]
    NotConfigured,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("No analysis found for this track")]
    NoMatch,
}

/// Tempo in BPM; energy and danceability on a 0-100 scale
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackAnalysis {
    pub tempo: f64,
    pub energy: u32,
    pub danceability: u32,
}

impl Default for TrackAnalysis {
    fn default() -> Self {
        Self {
            tempo: DEFAULT_TEMPO,
            energy: DEFAULT_ENERGY,
            danceability: DEFAULT_DANCEABILITY,
        }
    }
}

/// Audio-feature lookup by song title and artist
#[async_trait]
pub trait TrackAnalyzer: Send + Sync {
    async fn analyze(&self, song: &str, artist: &str) -> Result<TrackAnalysis, AnalysisError>;
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    artist: &'a str,
    track: &'a str,
    limit: u32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    track_ids: Option<Vec<serde_json::Value>>,
}

impl SearchResponse {
    /// First usable id; SoundStat has sent both strings and numbers
    fn first_id(&self) -> Option<String> {
        self.track_ids.as_deref()?.iter().find_map(|id| match id {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct Feature {
    #[serde(default)]
    value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct TrackDetails {
    #[serde(default)]
    tempo: Option<Feature>,
    #[serde(default)]
    energy: Option<Feature>,
    #[serde(default)]
    danceability: Option<Feature>,
}

fn feature(f: &Option<Feature>) -> Option<f64> {
    f.as_ref()?.value.filter(|v| v.is_finite())
}

/// 0.0-1.0 fraction as a whole percentage
fn percent(fraction: Option<f64>, default: u32) -> u32 {
    fraction
        .map(|v| (v.clamp(0.0, 1.0) * 100.0).round() as u32)
        .unwrap_or(default)
}

impl From<TrackDetails> for TrackAnalysis {
    fn from(details: TrackDetails) -> Self {
        Self {
            tempo: feature(&details.tempo)
                .filter(|t| *t > 0.0)
                .unwrap_or(DEFAULT_TEMPO),
            energy: percent(feature(&details.energy), DEFAULT_ENERGY),
            danceability: percent(feature(&details.danceability), DEFAULT_DANCEABILITY),
        }
    }
}

/// `<base>/track/<id>` with the id percent-encoded as one path segment
fn track_url(base_url: &str, track_id: &str) -> Result<reqwest::Url, AnalysisError> {
    let mut url =
        reqwest::Url::parse(base_url).map_err(|e| AnalysisError::Parse(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| AnalysisError::Parse(format!("Unusable base URL {}", base_url)))?
        .pop_if_empty()
        .push("track")
        .push(track_id);
    Ok(url)
}

/// SoundStat API client
pub struct SoundStatClient {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl SoundStatClient {
    pub fn new(config: &SoundStatConfig) -> Result<Self, AnalysisError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(AnalysisError::NotConfigured)?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AnalysisError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, AnalysisError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let error_text = response.text().await.unwrap_or_default();
        tracing::warn!(status = %status, "SoundStat request failed: {}", error_text);
        Err(AnalysisError::Api(status.as_u16(), error_text))
    }
}

#[async_trait]
impl TrackAnalyzer for SoundStatClient {
    async fn analyze(&self, song: &str, artist: &str) -> Result<TrackAnalysis, AnalysisError> {
        let response = self
            .http_client
            .post(format!("{}/tracks/search", self.base_url))
            .header("X-API-Key", &self.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&SearchRequest {
                artist,
                track: song,
                limit: 1,
            })
            .send()
            .await
            .map_err(|e| AnalysisError::Network(e.to_string()))?;

        let search: SearchResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| AnalysisError::Parse(e.to_string()))?;
        let track_id = search.first_id().ok_or(AnalysisError::NoMatch)?;

        let response = self
            .http_client
            .get(track_url(&self.base_url, &track_id)?)
            .header("X-API-Key", &self.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| AnalysisError::Network(e.to_string()))?;

        let details: TrackDetails = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| AnalysisError::Parse(e.to_string()))?;

        Ok(details.into())
    }
}

#[derive(Debug, Deserialize)]
pub struct AnalysisQuery {
    pub song: String,
    #[serde(default)]
    pub artist: String,
}

/// GET /api/track-analysis?song=&artist=
///
/// Always 200; falls back to tempo 120, energy 60, danceability 60.
pub async fn track_analysis(
    State(state): State<AppState>,
    Query(query): Query<AnalysisQuery>,
) -> Json<TrackAnalysis> {
    let Some(analyzer) = state.analyzer.as_ref() else {
        tracing::debug!("SoundStat not configured, returning default analysis");
        return Json(TrackAnalysis::default());
    };

    match analyzer.analyze(query.song.trim(), query.artist.trim()).await {
        Ok(analysis) => Json(analysis),
        Err(AnalysisError::NoMatch) => {
            tracing::debug!(song = %query.song, artist = %query.artist, "No SoundStat match");
            Json(TrackAnalysis::default())
        }
        Err(e) => {
            tracing::error!(song = %query.song, artist = %query.artist, "Track analysis failed: {}", e);
            state.record_error(format!("Track analysis failed: {}", e)).await;
            Json(TrackAnalysis::default())
        }
    }
}

/// Build track analysis routes
pub fn analysis_routes() -> Router<AppState> {
    Router::new().route("/api/track-analysis", get(track_analysis))
}
