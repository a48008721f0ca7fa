//! Spotify authorization-code flow
//!
//! Builds the consent URL, exchanges the callback code for tokens and
//! refreshes expired access tokens.

use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;
use yourfm_common::config::SpotifyConfig;

use super::CatalogError;

/// Scopes requested from the user
pub const SPOTIFY_SCOPE: &str =
    "streaming user-read-email user-read-private user-modify-playback-state user-read-playback-state";

/// Tokens granted by the accounts service
#[derive(Debug, Clone, PartialEq)]
pub struct TokenGrant {
    pub access_token: String,
    /// Absent on refresh responses that keep the previous refresh token
    pub refresh_token: Option<String>,
    /// Unix epoch seconds
    pub expires_at: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

impl TokenResponse {
    fn into_grant(self) -> TokenGrant {
        TokenGrant {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: yourfm_common::time::unix_seconds() + self.expires_in,
        }
    }
}

/// OAuth client for the Spotify accounts service
#[derive(Clone)]
pub struct SpotifyOAuth {
    http_client: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_uri: Option<String>,
    accounts_base_url: String,
}

impl SpotifyOAuth {
    /// Returns `None` when client credentials are not configured
    pub fn from_config(config: &SpotifyConfig) -> Option<Self> {
        if !config.is_configured() {
            return None;
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .ok()?;

        Some(Self {
            http_client,
            client_id: config.client_id.clone()?,
            client_secret: config.client_secret.clone()?,
            redirect_uri: config.redirect_uri.clone(),
            accounts_base_url: config.accounts_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Consent page the user is sent to
    pub fn authorize_url(&self) -> Result<String, CatalogError> {
        let mut params = vec![
            ("client_id", self.client_id.as_str()),
            ("response_type", "code"),
            ("scope", SPOTIFY_SCOPE),
        ];
        if let Some(redirect_uri) = &self.redirect_uri {
            params.push(("redirect_uri", redirect_uri.as_str()));
        }

        let url = Url::parse_with_params(&format!("{}/authorize", self.accounts_base_url), &params)
            .map_err(|e| CatalogError::Parse(e.to_string()))?;
        Ok(url.to_string())
    }

    /// Exchange an authorization code from the callback
    pub async fn exchange_code(&self, code: &str) -> Result<TokenGrant, CatalogError> {
        let mut form = vec![("grant_type", "authorization_code"), ("code", code)];
        if let Some(redirect_uri) = &self.redirect_uri {
            form.push(("redirect_uri", redirect_uri.as_str()));
        }
        self.request_token(&form).await
    }

    /// Trade a refresh token for a new access token
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, CatalogError> {
        let form = [("grant_type", "refresh_token"), ("refresh_token", refresh_token)];
        let mut grant = self.request_token(&form).await?;
        if grant.refresh_token.is_none() {
            grant.refresh_token = Some(refresh_token.to_string());
        }
        Ok(grant)
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenGrant, CatalogError> {
        let response = self
            .http_client
            .post(format!("{}/api/token", self.accounts_base_url))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(form)
            .send()
            .await
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::BAD_REQUEST || status == reqwest::StatusCode::UNAUTHORIZED {
            // invalid_grant / invalid_client: the user has to authorize again
            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, "Spotify token request rejected: {}", error_text);
            return Err(CatalogError::Unauthenticated);
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(CatalogError::Api(status.as_u16(), error_text));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))?;
        Ok(token.into_grant())
    }
}
