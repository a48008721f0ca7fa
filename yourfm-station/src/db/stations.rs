//! Station persistence

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::mixer::SeedArtist;

/// Stored station
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Station {
    pub id: String,
    pub name: String,
    pub genres: Vec<String>,
    pub artists: Vec<SeedArtist>,
    pub bumper_topics: Vec<String>,
    pub voice_id: String,
    pub voice_name: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    /// Single-genre column kept for older clients
    pub genre: Option<String>,
}

/// Station fields a client may set
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StationInput {
    pub name: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub artists: Vec<SeedArtist>,
    #[serde(default)]
    pub bumper_topics: Vec<String>,
    #[serde(default)]
    pub voice_id: String,
    #[serde(default)]
    pub voice_name: String,
}

/// Artists column: `{id, name}` objects, or bare names in legacy rows
fn parse_artists(raw: &str) -> Vec<SeedArtist> {
    let values: Vec<serde_json::Value> = serde_json::from_str(raw).unwrap_or_default();
    values
        .into_iter()
        .enumerate()
        .filter_map(|(i, value)| match value {
            serde_json::Value::String(name) => Some(SeedArtist {
                id: format!("legacy_{}", i),
                name,
            }),
            other => serde_json::from_value(other).ok(),
        })
        .collect()
}

/// Genres column, falling back to the legacy single `genre`
fn parse_genres(raw: &str, legacy: Option<&str>) -> Vec<String> {
    let genres: Vec<String> = serde_json::from_str(raw).unwrap_or_default();
    if !genres.is_empty() {
        return genres;
    }
    legacy
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(|g| vec![g.to_string()])
        .unwrap_or_default()
}

fn station_from_row(row: &SqliteRow) -> Result<Station> {
    let genres_raw: String = row.get("genres");
    let artists_raw: String = row.get("artists");
    let topics_raw: String = row.get("bumper_topics");
    let genre: Option<String> = row.get("genre");
    let created_at: String = row.get("created_at");

    Ok(Station {
        id: row.get("id"),
        name: row.get("name"),
        genres: parse_genres(&genres_raw, genre.as_deref()),
        artists: parse_artists(&artists_raw),
        bumper_topics: serde_json::from_str(&topics_raw).unwrap_or_default(),
        voice_id: row.get("voice_id"),
        voice_name: row.get("voice_name"),
        user_id: row.get("user_id"),
        created_at: DateTime::parse_from_rfc3339(&created_at)?.with_timezone(&Utc),
        genre,
    })
}

/// Insert a new station for `user_id`
pub async fn create_station(pool: &SqlitePool, user_id: &str, input: &StationInput) -> Result<Station> {
    let station = Station {
        id: Uuid::new_v4().to_string(),
        name: input.name.clone(),
        genres: input.genres.clone(),
        artists: input.artists.clone(),
        bumper_topics: input.bumper_topics.clone(),
        voice_id: input.voice_id.clone(),
        voice_name: input.voice_name.clone(),
        user_id: user_id.to_string(),
        created_at: Utc::now(),
        genre: input.genres.first().cloned(),
    };

    sqlx::query(
        r#"
        INSERT INTO stations (
            id, user_id, name, genres, artists, bumper_topics, voice_id, voice_name,
            genre, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&station.id)
    .bind(&station.user_id)
    .bind(&station.name)
    .bind(serde_json::to_string(&station.genres)?)
    .bind(serde_json::to_string(&station.artists)?)
    .bind(serde_json::to_string(&station.bumper_topics)?)
    .bind(&station.voice_id)
    .bind(&station.voice_name)
    .bind(&station.genre)
    .bind(station.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    tracing::info!(station_id = %station.id, name = %station.name, "Station created");

    Ok(station)
}

/// Stations owned by `user_id`, newest first
pub async fn list_stations(pool: &SqlitePool, user_id: &str, limit: i64) -> Result<Vec<Station>> {
    let rows = sqlx::query(
        r#"
        SELECT id, user_id, name, genres, artists, bumper_topics, voice_id, voice_name,
               genre, created_at
        FROM stations
        WHERE user_id = ?
        ORDER BY created_at DESC
        LIMIT ?
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.iter().map(station_from_row).collect()
}

/// Load one station
pub async fn get_station(pool: &SqlitePool, id: &str) -> Result<Option<Station>> {
    let row = sqlx::query(
        r#"
        SELECT id, user_id, name, genres, artists, bumper_topics, voice_id, voice_name,
               genre, created_at
        FROM stations
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(station_from_row).transpose()
}

/// Replace a station's fields, keeping its id, owner and creation time
///
/// Only stations owned by `user_id` are touched.
pub async fn update_station(
    pool: &SqlitePool,
    user_id: &str,
    id: &str,
    input: &StationInput,
) -> Result<Option<Station>> {
    let result = sqlx::query(
        r#"
        UPDATE stations
        SET name = ?, genres = ?, artists = ?, bumper_topics = ?, voice_id = ?,
            voice_name = ?, genre = ?
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(&input.name)
    .bind(serde_json::to_string(&input.genres)?)
    .bind(serde_json::to_string(&input.artists)?)
    .bind(serde_json::to_string(&input.bumper_topics)?)
    .bind(&input.voice_id)
    .bind(&input.voice_name)
    .bind(input.genres.first().cloned())
    .bind(id)
    .bind(user_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_station(pool, id).await
}

/// Delete one of `user_id`'s stations; false when there was none
pub async fn delete_station(pool: &SqlitePool, user_id: &str, id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM stations WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
