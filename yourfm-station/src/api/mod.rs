//! HTTP API handlers for yourfm-station
//!
//! Everything except `/health` lives under `/api`.

pub mod analysis;
pub mod auth;
pub mod bumpers;
pub mod health;
pub mod spotify;
pub mod stations;
pub mod tracks;
pub mod voices;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use crate::AppState;

pub use analysis::analysis_routes;
pub use bumpers::bumper_routes;
pub use health::health_routes;
pub use spotify::spotify_routes;
pub use stations::station_routes;
pub use tracks::track_routes;
pub use voices::voice_routes;

/// GET /api/
pub async fn api_root() -> Json<Value> {
    Json(json!({ "message": "Radio App API" }))
}

/// All `/api` routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api", get(api_root))
        .route("/api/", get(api_root))
        .merge(spotify_routes())
        .merge(track_routes())
        .merge(station_routes())
        .merge(voice_routes())
        .merge(bumper_routes())
        .merge(analysis_routes())
}
