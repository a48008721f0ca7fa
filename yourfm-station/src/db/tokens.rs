//! Spotify token storage (one row per user)

use anyhow::Result;
use sqlx::{Row, SqlitePool};

use crate::catalog::TokenGrant;

/// Stored access/refresh token pair
#[derive(Debug, Clone, PartialEq)]
pub struct StoredToken {
    pub user_id: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Unix epoch seconds
    pub expires_at: i64,
}

impl StoredToken {
    /// Expired, or expiring within `skew_secs`
    pub fn is_expired(&self, skew_secs: i64) -> bool {
        yourfm_common::time::is_expired(self.expires_at, skew_secs)
    }
}

/// Insert or replace the user's token
///
/// A grant without a refresh token keeps the one already stored.
pub async fn save_token(pool: &SqlitePool, user_id: &str, grant: &TokenGrant) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO spotify_tokens (user_id, access_token, refresh_token, expires_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(user_id) DO UPDATE SET
            access_token = excluded.access_token,
            refresh_token = COALESCE(excluded.refresh_token, spotify_tokens.refresh_token),
            expires_at = excluded.expires_at,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(user_id)
    .bind(&grant.access_token)
    .bind(&grant.refresh_token)
    .bind(grant.expires_at)
    .bind(yourfm_common::time::now().to_rfc3339())
    .execute(pool)
    .await?;

    tracing::debug!(user_id = %user_id, expires_at = grant.expires_at, "Spotify token stored");

    Ok(())
}

/// Load the user's token
pub async fn load_token(pool: &SqlitePool, user_id: &str) -> Result<Option<StoredToken>> {
    let row = sqlx::query(
        r#"
        SELECT user_id, access_token, refresh_token, expires_at
        FROM spotify_tokens
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| StoredToken {
        user_id: row.get("user_id"),
        access_token: row.get("access_token"),
        refresh_token: row.get("refresh_token"),
        expires_at: row.get("expires_at"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{test_pool, DEFAULT_USER_ID};

    fn grant(access: &str, refresh: Option<&str>, expires_at: i64) -> TokenGrant {
        TokenGrant {
            access_token: access.to_string(),
            refresh_token: refresh.map(str::to_string),
            expires_at,
        }
    }

    #[tokio::test]
    async fn test_missing_token() {
        let pool = test_pool().await;
        assert!(load_token(&pool, DEFAULT_USER_ID).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_and_replace_keeps_refresh_token() {
        let pool = test_pool().await;
        save_token(&pool, DEFAULT_USER_ID, &grant("a1", Some("r1"), 100)).await.unwrap();
        save_token(&pool, DEFAULT_USER_ID, &grant("a2", None, 200)).await.unwrap();

        let token = load_token(&pool, DEFAULT_USER_ID).await.unwrap().unwrap();
        assert_eq!(token.access_token, "a2");
        assert_eq!(token.refresh_token.as_deref(), Some("r1"));
        assert_eq!(token.expires_at, 200);
    }

    #[test]
    fn test_expiry_with_skew() {
        let now = yourfm_common::time::unix_seconds();
        let token = StoredToken {
            user_id: DEFAULT_USER_ID.to_string(),
            access_token: "a".to_string(),
            refresh_token: None,
            expires_at: now + 30,
        };
        assert!(token.is_expired(60));
        assert!(!token.is_expired(0));
    }
}
