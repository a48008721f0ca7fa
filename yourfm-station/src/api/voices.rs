//! Voice listing endpoint

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::bumpers::Voice;
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Serialize)]
pub struct VoicesResponse {
    pub voices: Vec<Voice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// GET /api/elevenlabs/voices
///
/// Only voices the account owns (cloned, generated, professional); premade
/// library voices are left out.
pub async fn list_voices(State(state): State<AppState>) -> ApiResult<Json<VoicesResponse>> {
    let synthesizer = state
        .synthesizer
        .as_ref()
        .ok_or_else(|| ApiError::NotConfigured("ElevenLabs API key not configured".to_string()))?;

    let voices = match synthesizer.list_voices().await {
        Ok(voices) => voices,
        Err(e) => {
            state.record_error(format!("Voice listing failed: {}", e)).await;
            return Err(e.into());
        }
    };

    let voices: Vec<Voice> = voices.into_iter().filter(Voice::is_owned).collect();

    if voices.is_empty() {
        tracing::warn!("No custom voices found for this API key");
        return Ok(Json(VoicesResponse {
            voices,
            message: Some(
                "No custom voices found. Please create voices in your ElevenLabs account at elevenlabs.io"
                    .to_string(),
            ),
        }));
    }

    Ok(Json(VoicesResponse {
        voices,
        message: None,
    }))
}

/// Build voice routes
pub fn voice_routes() -> Router<AppState> {
    Router::new().route("/api/elevenlabs/voices", get(list_voices))
}
