//! Station CRUD endpoints

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};

use crate::db::stations::{self, Station, StationInput};
use crate::db::DEFAULT_USER_ID;
use crate::{ApiError, ApiResult, AppState};

/// Most stations returned by a list call
const MAX_LISTED_STATIONS: i64 = 100;

fn validate(input: &StationInput) -> ApiResult<()> {
    if input.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Station name must not be empty".to_string()));
    }
    Ok(())
}

fn not_found() -> ApiError {
    ApiError::NotFound("Station not found".to_string())
}

/// POST /api/stations
pub async fn create_station(
    State(state): State<AppState>,
    Json(input): Json<StationInput>,
) -> ApiResult<Json<Station>> {
    validate(&input)?;
    let station = stations::create_station(&state.db, DEFAULT_USER_ID, &input).await?;
    Ok(Json(station))
}

/// GET /api/stations
pub async fn list_stations(State(state): State<AppState>) -> ApiResult<Json<Vec<Station>>> {
    let stations = stations::list_stations(&state.db, DEFAULT_USER_ID, MAX_LISTED_STATIONS).await?;
    Ok(Json(stations))
}

/// GET /api/stations/:id
pub async fn get_station(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Station>> {
    stations::get_station(&state.db, &id)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

/// PUT /api/stations/:id
///
/// Replaces every client-settable field; id and creation time are kept.
pub async fn update_station(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<StationInput>,
) -> ApiResult<Json<Station>> {
    validate(&input)?;
    stations::update_station(&state.db, DEFAULT_USER_ID, &id, &input)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

/// DELETE /api/stations/:id
pub async fn delete_station(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    if !stations::delete_station(&state.db, DEFAULT_USER_ID, &id).await? {
        return Err(not_found());
    }
    tracing::info!(station_id = %id, "Station deleted");
    Ok(Json(json!({ "message": "Station deleted successfully" })))
}

/// Build station routes
pub fn station_routes() -> Router<AppState> {
    Router::new()
        .route("/api/stations", get(list_stations).post(create_station))
        .route(
            "/api/stations/:id",
            get(get_station).put(update_station).delete(delete_station),
        )
}
