//! yourfm-station library interface
//!
//! Exposes the station service for the binary and for integration tests.

pub mod api;
pub mod bumpers;
pub mod catalog;
pub mod db;
pub mod error;
pub mod mixer;

pub use crate::error::{ApiError, ApiResult};

use axum::http::HeaderValue;
use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::analysis::TrackAnalyzer;
use crate::bumpers::{SpeechSynthesizer, TextGenerator};
use crate::catalog::{CatalogConnector, SpotifyOAuth};
use crate::mixer::DiscoveryMixer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Builds a catalog client per request from the stored access token
    pub catalog: Arc<dyn CatalogConnector>,
    /// Spotify OAuth client; `None` without client credentials
    pub oauth: Option<SpotifyOAuth>,
    pub text_generator: Option<Arc<dyn TextGenerator>>,
    pub synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    /// Audio-feature lookups; `None` serves the default analysis
    pub analyzer: Option<Arc<dyn TrackAnalyzer>>,
    pub mixer: Arc<DiscoveryMixer>,
    /// Where the OAuth callback sends the browser back to
    pub frontend_url: String,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last upstream error for diagnostics
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(db: SqlitePool, catalog: Arc<dyn CatalogConnector>, mixer: DiscoveryMixer) -> Self {
        Self {
            db,
            catalog,
            oauth: None,
            text_generator: None,
            synthesizer: None,
            analyzer: None,
            mixer: Arc::new(mixer),
            frontend_url: "http://localhost:3000".to_string(),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_oauth(mut self, oauth: Option<SpotifyOAuth>) -> Self {
        self.oauth = oauth;
        self
    }

    pub fn with_text_generator(mut self, generator: Option<Arc<dyn TextGenerator>>) -> Self {
        self.text_generator = generator;
        self
    }

    pub fn with_synthesizer(mut self, synthesizer: Option<Arc<dyn SpeechSynthesizer>>) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    pub fn with_analyzer(mut self, analyzer: Option<Arc<dyn TrackAnalyzer>>) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn with_frontend_url(mut self, frontend_url: impl Into<String>) -> Self {
        self.frontend_url = frontend_url.into();
        self
    }

    /// Remember an upstream failure for `/health`
    pub async fn record_error(&self, message: impl Into<String>) {
        *self.last_error.write().await = Some(message.into());
    }
}

/// CORS layer for the configured origins; `*` allows any origin
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.is_empty() || origins.iter().any(|o| o.trim() == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect();
    layer.allow_origin(allowed)
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    build_router_with_cors(state, &["*".to_string()])
}

/// Build application router with explicit CORS origins
pub fn build_router_with_cors(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
        .with_state(state)
}
