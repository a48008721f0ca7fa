//! Discovery mixer
//!
//! Turns a station's seed artists and genres into a playlist: seed-artist
//! top tracks form the selected pool, genre-scoped searches fill the
//! discovery pool, and assembly samples and interleaves the two.
//!
//! Mixing is stateless; every call starts from scratch.

pub mod assembly;
pub mod discovery;
pub mod genre_rules;
pub mod types;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::info;
use yourfm_common::config::MixerConfig;

use crate::catalog::{CatalogClient, CatalogError};

pub use assembly::{assemble, split_targets};
pub use discovery::{target_genres, Discovery, SeedSet};
pub use genre_rules::{genre_overlaps, normalize_genre, GenreFamily, GenreRules};
pub use types::{
    CandidateTrack, DiscoverySummary, ItemOutcome, SeedArtist, SeedArtistInput, SkipReason,
};

/// Largest playlist a request may ask for
pub const MAX_TARGET_TOTAL: usize = 200;

/// Mixer errors
#[derive(Debug, Error)]
pub enum MixError {
    /// The catalog rejected our credentials; no partial result is returned
    #[error("Not authenticated with the catalog service")]
    Unauthenticated,

    #[error("Catalog error: {0}")]
    Catalog(CatalogError),
}

impl From<CatalogError> for MixError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Unauthenticated => MixError::Unauthenticated,
            other => MixError::Catalog(other),
        }
    }
}

/// Mix request body
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MixRequest {
    #[serde(default)]
    pub artists: Vec<SeedArtistInput>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub target_total: Option<usize>,
    #[serde(default)]
    pub discovery_ratio: Option<f64>,
    #[serde(default)]
    pub discovery_limit: Option<usize>,
}

/// Mix result: the ordered playlist and what happened while building it
#[derive(Debug, Clone, Serialize)]
pub struct MixOutcome {
    pub tracks: Vec<CandidateTrack>,
    pub summary: DiscoverySummary,
}

/// Effective pool sizes for one request
#[derive(Debug, Clone, Copy, PartialEq)]
struct MixPlan {
    target_total: usize,
    discovery_ratio: f64,
    discovery_limit: usize,
}

/// Playlist builder configured once at startup and shared across requests
#[derive(Debug, Clone)]
pub struct DiscoveryMixer {
    config: MixerConfig,
    rules: GenreRules,
}

impl DiscoveryMixer {
    pub fn new(config: MixerConfig) -> Self {
        Self::with_rules(config, GenreRules::builtin())
    }

    pub fn with_rules(config: MixerConfig, rules: GenreRules) -> Self {
        Self { config, rules }
    }

    pub fn config(&self) -> &MixerConfig {
        &self.config
    }

    fn plan(&self, request: &MixRequest) -> MixPlan {
        let target_total = request
            .target_total
            .unwrap_or(self.config.target_total)
            .clamp(1, MAX_TARGET_TOTAL);
        let discovery_ratio = request
            .discovery_ratio
            .filter(|r| r.is_finite())
            .unwrap_or(self.config.discovery_ratio)
            .clamp(0.0, 1.0);
        let discovery_limit = request
            .discovery_limit
            .unwrap_or(self.config.discovery_limit)
            .max(target_total);

        MixPlan {
            target_total,
            discovery_ratio,
            discovery_limit,
        }
    }

    /// Build a playlist for `request`
    pub async fn mix(
        &self,
        catalog: &dyn CatalogClient,
        request: &MixRequest,
    ) -> Result<MixOutcome, MixError> {
        let plan = self.plan(request);
        let discovery = Discovery::new(catalog, &self.config, &self.rules);

        let resolved = discovery.resolve_seeds(&request.artists).await?;
        let targets = target_genres(&resolved.genres, &request.genres, self.config.max_target_genres);

        let selected = discovery.seed_pool(&resolved.seeds).await?;
        let exclude: HashSet<String> = selected.tracks.iter().map(|t| t.uri.clone()).collect();

        let found = discovery
            .discover(&resolved.seeds, &request.genres, &targets, exclude, plan.discovery_limit)
            .await?;

        let mut summary = found.summary;
        summary.merge_counts(&selected.summary);
        summary.selected_pool_size = selected.tracks.len();

        let mut rng = StdRng::from_entropy();
        let tracks = assemble(
            selected.tracks,
            found.tracks,
            plan.target_total,
            plan.discovery_ratio,
            self.config.interleave_run,
            &mut rng,
        );

        summary.final_discovery = tracks.iter().filter(|t| t.is_discovery).count();
        summary.final_selected = tracks.len() - summary.final_discovery;

        info!(
            seeds = resolved.seeds.ids().len(),
            genres = ?summary.target_genres,
            selected_pool = summary.selected_pool_size,
            discovery_pool = summary.discovery_pool_size,
            skipped = summary.skipped_total(),
            "Mix complete: {} tracks ({} discovery, {} selected)",
            tracks.len(),
            summary.final_discovery,
            summary.final_selected
        );

        Ok(MixOutcome { tracks, summary })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mixer() -> DiscoveryMixer {
        DiscoveryMixer::new(MixerConfig::default())
    }

    #[test]
    fn test_plan_uses_config_defaults() {
        let plan = mixer().plan(&MixRequest::default());
        assert_eq!(plan.target_total, 50);
        assert_eq!(plan.discovery_ratio, 0.8);
        assert_eq!(plan.discovery_limit, 200);
    }

    #[test]
    fn test_plan_clamps_overrides() {
        let request = MixRequest {
            target_total: Some(5000),
            discovery_ratio: Some(3.0),
            discovery_limit: Some(10),
            ..MixRequest::default()
        };
        let plan = mixer().plan(&request);
        assert_eq!(plan.target_total, MAX_TARGET_TOTAL);
        assert_eq!(plan.discovery_ratio, 1.0);
        // The discovery pool must be able to fill the whole playlist
        assert_eq!(plan.discovery_limit, MAX_TARGET_TOTAL);

        let request = MixRequest {
            target_total: Some(0),
            discovery_ratio: Some(f64::NAN),
            ..MixRequest::default()
        };
        let plan = mixer().plan(&request);
        assert_eq!(plan.target_total, 1);
        assert_eq!(plan.discovery_ratio, 0.8);
    }

    #[test]
    fn test_request_accepts_mixed_artist_shapes() {
        let request: MixRequest = serde_json::from_str(
            r#"{"artists":[{"id":"a1","name":"Tool"},"a2"],"genres":["metal"]}"#,
        )
        .unwrap();
        assert_eq!(request.artists.len(), 2);
        assert_eq!(request.genres, vec!["metal"]);
        assert!(request.target_total.is_none());
    }
}
