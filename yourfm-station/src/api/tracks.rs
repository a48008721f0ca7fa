//! Playlist endpoint backed by the discovery mixer

use axum::{extract::State, routing::post, Json, Router};

use super::auth::catalog_client;
use crate::mixer::{MixError, MixOutcome, MixRequest};
use crate::{ApiResult, AppState};

/// POST /api/spotify/tracks
///
/// **Request:** `{"artists": [{"id", "name"} | "id"], "genres": [..],
/// "target_total"?, "discovery_ratio"?, "discovery_limit"?}`
/// **Response:** `{"tracks": [..], "summary": {..}}`
///
/// **Errors:**
/// - 401 Not Authenticated: no usable token, or the catalog rejected it
pub async fn mix_tracks(
    State(state): State<AppState>,
    Json(request): Json<MixRequest>,
) -> ApiResult<Json<MixOutcome>> {
    tracing::info!(
        artists = request.artists.len(),
        genres = ?request.genres,
        "Mix requested"
    );

    let catalog = catalog_client(&state).await?;

    let outcome = match state.mixer.mix(catalog.as_ref(), &request).await {
        Ok(outcome) => outcome,
        Err(e) => {
            if let MixError::Catalog(ref inner) = e {
                state.record_error(format!("Mix failed: {}", inner)).await;
            }
            return Err(e.into());
        }
    };

    Ok(Json(outcome))
}

/// Build track routes
pub fn track_routes() -> Router<AppState> {
    Router::new().route("/api/spotify/tracks", post(mix_tracks))
}
