//! Bumper generation endpoint

use axum::{extract::State, routing::post, Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Serialize;

use crate::bumpers::{generate_bumper, BumperRequest};
use crate::db::bumpers::{save_bumper, BumperRecord};
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Serialize)]
pub struct BumperResponse {
    pub id: String,
    pub text: String,
    /// `data:audio/mpeg;base64,...`
    pub audio_url: String,
}

/// POST /api/bumpers/generate
///
/// **Errors:**
/// - 500 Not Configured: Gemini or ElevenLabs key missing
/// - 502 Upstream: text or speech service failed
pub async fn generate(
    State(state): State<AppState>,
    Json(request): Json<BumperRequest>,
) -> ApiResult<Json<BumperResponse>> {
    let text_generator = state
        .text_generator
        .as_ref()
        .ok_or_else(|| ApiError::NotConfigured("Gemini API key not configured".to_string()))?;
    let synthesizer = state
        .synthesizer
        .as_ref()
        .ok_or_else(|| ApiError::NotConfigured("ElevenLabs API key not configured".to_string()))?;

    if request.voice_id.trim().is_empty() {
        return Err(ApiError::BadRequest("voice_id must not be empty".to_string()));
    }

    tracing::info!(
        station_id = %request.station_id,
        track = ?request.current_track_name,
        artist = ?request.current_track_artist,
        "Bumper requested"
    );

    let bumper = match generate_bumper(text_generator.as_ref(), synthesizer.as_ref(), &request).await {
        Ok(bumper) => bumper,
        Err(e) => {
            tracing::error!("Error generating bumper: {}", e);
            state.record_error(format!("Bumper generation failed: {}", e)).await;
            return Err(e.into());
        }
    };

    let audio_base64 = BASE64.encode(&bumper.audio);
    let record = BumperRecord::new(&request.station_id, bumper.text, audio_base64, &request.voice_id);
    save_bumper(&state.db, &record).await?;

    Ok(Json(BumperResponse {
        audio_url: format!("data:audio/mpeg;base64,{}", record.audio_base64),
        id: record.id,
        text: record.text,
    }))
}

/// Build bumper routes
pub fn bumper_routes() -> Router<AppState> {
    Router::new().route("/api/bumpers/generate", post(generate))
}
