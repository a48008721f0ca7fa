//! Generated bumper storage

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Stored bumper; audio is base64-encoded MP3
#[derive(Debug, Clone, PartialEq)]
pub struct BumperRecord {
    pub id: String,
    pub station_id: String,
    pub text: String,
    pub audio_base64: String,
    pub voice_id: String,
    pub created_at: DateTime<Utc>,
}

impl BumperRecord {
    pub fn new(station_id: &str, text: String, audio_base64: String, voice_id: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            station_id: station_id.to_string(),
            text,
            audio_base64,
            voice_id: voice_id.to_string(),
            created_at: Utc::now(),
        }
    }
}

fn bumper_from_row(row: &SqliteRow) -> Result<BumperRecord> {
    let created_at: String = row.get("created_at");
    Ok(BumperRecord {
        id: row.get("id"),
        station_id: row.get("station_id"),
        text: row.get("text"),
        audio_base64: row.get("audio_base64"),
        voice_id: row.get("voice_id"),
        created_at: DateTime::parse_from_rfc3339(&created_at)?.with_timezone(&Utc),
    })
}

pub async fn save_bumper(pool: &SqlitePool, bumper: &BumperRecord) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO bumpers (id, station_id, text, audio_base64, voice_id, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&bumper.id)
    .bind(&bumper.station_id)
    .bind(&bumper.text)
    .bind(&bumper.audio_base64)
    .bind(&bumper.voice_id)
    .bind(bumper.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Bumpers generated for a station, newest first
pub async fn list_bumpers_for_station(pool: &SqlitePool, station_id: &str) -> Result<Vec<BumperRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT id, station_id, text, audio_base64, voice_id, created_at
        FROM bumpers
        WHERE station_id = ?
        ORDER BY created_at DESC
        "#,
    )
    .bind(station_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(bumper_from_row).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn test_save_and_list() {
        let pool = test_pool().await;
        let bumper = BumperRecord::new("s1", "Rock on!".to_string(), "//s=".to_string(), "v1");
        save_bumper(&pool, &bumper).await.unwrap();
        save_bumper(&pool, &BumperRecord::new("s2", "Other".to_string(), String::new(), "v1"))
            .await
            .unwrap();

        let stored = list_bumpers_for_station(&pool, "s1").await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, bumper.id);
        assert_eq!(stored[0].text, "Rock on!");
        assert_eq!(stored[0].audio_base64, "//s=");
    }
}
