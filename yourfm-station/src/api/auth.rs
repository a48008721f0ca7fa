//! Spotify access token resolution for request handlers

use std::sync::Arc;

use crate::catalog::CatalogClient;
use crate::db::{self, DEFAULT_USER_ID};
use crate::{ApiError, ApiResult, AppState};

/// Tokens this close to expiry are refreshed before use
pub const TOKEN_EXPIRY_SKEW_SECS: i64 = 60;

/// Current access token, refreshed and persisted when expired
///
/// No stored token, or an expired one that cannot be refreshed, is
/// [`ApiError::Unauthenticated`].
pub async fn access_token(state: &AppState) -> ApiResult<String> {
    let token = db::tokens::load_token(&state.db, DEFAULT_USER_ID)
        .await?
        .ok_or(ApiError::Unauthenticated)?;

    if !token.is_expired(TOKEN_EXPIRY_SKEW_SECS) {
        return Ok(token.access_token);
    }

    let (oauth, refresh_token) = match (&state.oauth, token.refresh_token.as_deref()) {
        (Some(oauth), Some(refresh_token)) => (oauth, refresh_token),
        _ => {
            tracing::warn!("Spotify token expired and cannot be refreshed");
            return Err(ApiError::Unauthenticated);
        }
    };

    let grant = oauth.refresh(refresh_token).await.map_err(|e| {
        tracing::warn!("Spotify token refresh failed: {}", e);
        ApiError::from(e)
    })?;

    db::tokens::save_token(&state.db, DEFAULT_USER_ID, &grant).await?;
    tracing::info!("Spotify access token refreshed");

    Ok(grant.access_token)
}

/// Catalog client authorized as the local user
pub async fn catalog_client(state: &AppState) -> ApiResult<Arc<dyn CatalogClient>> {
    let token = access_token(state).await?;
    Ok(state.catalog.connect(&token))
}
