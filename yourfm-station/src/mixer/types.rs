//! Data types for the discovery mixer

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::catalog::CatalogTrack;

/// An artist the user chose for the station
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct SeedArtist {
    pub id: String,
    pub name: String,
}

/// Seed artists arrive either as `{id, name}` objects or as bare ids
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum SeedArtistInput {
    Artist(SeedArtist),
    Id(String),
}

impl SeedArtistInput {
    pub fn id(&self) -> &str {
        match self {
            SeedArtistInput::Artist(a) => &a.id,
            SeedArtistInput::Id(id) => id,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            SeedArtistInput::Artist(a) => Some(&a.name),
            SeedArtistInput::Id(_) => None,
        }
    }
}

/// Track descriptor returned to the client
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CandidateTrack {
    /// Unique key
    pub uri: String,
    pub name: String,
    /// Primary artist name
    pub artist: String,
    /// Primary artist id
    pub artist_id: String,
    pub album: String,
    /// Album artwork URL
    pub image: Option<String>,
    pub duration_ms: u64,
    pub preview_url: Option<String>,
    pub is_discovery: bool,
}

impl CandidateTrack {
    /// Shape a catalog track; tracks without a credited artist are dropped
    pub fn from_catalog(track: &CatalogTrack, is_discovery: bool) -> Option<Self> {
        let artist = track.primary_artist()?;
        Some(Self {
            uri: track.uri.clone(),
            name: track.name.clone(),
            artist: artist.name.clone(),
            artist_id: artist.id.clone(),
            album: track.album.name.clone(),
            image: track.album.images.first().map(|i| i.url.clone()),
            duration_ms: track.duration_ms,
            preview_url: track.preview_url.clone(),
            is_discovery,
        })
    }
}

/// Why a candidate item was left out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Result is one of the seed artists
    SeedArtist,
    /// A candidate genre hit the station's blocklist
    Blocked { genre: String },
    /// Candidate reports genres but none overlap the target genres
    NoGenreOverlap,
    /// Track URI already in one of the pools
    DuplicateTrack,
    /// Track has no usable artist credit
    Malformed,
    /// Upstream call failed
    Upstream(String),
    /// Upstream call exceeded the per-call timeout
    TimedOut,
}

impl SkipReason {
    /// Stable key used in the summary
    pub fn kind(&self) -> &'static str {
        match self {
            SkipReason::SeedArtist => "seed_artist",
            SkipReason::Blocked { .. } => "blocked_genre",
            SkipReason::NoGenreOverlap => "no_genre_overlap",
            SkipReason::DuplicateTrack => "duplicate_track",
            SkipReason::Malformed => "malformed",
            SkipReason::Upstream(_) => "upstream_error",
            SkipReason::TimedOut => "timed_out",
        }
    }
}

/// Result of processing one external item
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome<T> {
    Accepted(T),
    Skipped(SkipReason),
}

impl<T> ItemOutcome<T> {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ItemOutcome::Accepted(_))
    }
}

/// Per-request observability for one mix
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct DiscoverySummary {
    /// Genres used for candidate search, in search order
    pub target_genres: Vec<String>,
    pub genres_searched: usize,
    pub candidates_considered: usize,
    pub artists_accepted: usize,
    pub selected_pool_size: usize,
    pub discovery_pool_size: usize,
    pub final_selected: usize,
    pub final_discovery: usize,
    /// Skip counts keyed by [`SkipReason::kind`]
    pub skipped: BTreeMap<String, usize>,
}

impl DiscoverySummary {
    pub fn record_skip(&mut self, reason: &SkipReason) {
        *self.skipped.entry(reason.kind().to_string()).or_insert(0) += 1;
    }

    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }

    /// Fold another worker's counters into this one
    pub fn merge_counts(&mut self, other: &DiscoverySummary) {
        self.genres_searched += other.genres_searched;
        self.candidates_considered += other.candidates_considered;
        self.artists_accepted += other.artists_accepted;
        for (kind, count) in &other.skipped {
            *self.skipped.entry(kind.clone()).or_insert(0) += count;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ArtistRef, CatalogAlbum, CatalogImage};

    #[test]
    fn test_seed_input_accepts_objects_and_ids() {
        let inputs: Vec<SeedArtistInput> =
            serde_json::from_str(r#"[{"id":"a1","name":"Tool"},"a2"]"#).unwrap();
        assert_eq!(inputs[0].id(), "a1");
        assert_eq!(inputs[0].name(), Some("Tool"));
        assert_eq!(inputs[1].id(), "a2");
        assert_eq!(inputs[1].name(), None);
    }

    #[test]
    fn test_from_catalog_uses_primary_artist_and_first_image() {
        let track = CatalogTrack {
            uri: "spotify:track:1".to_string(),
            name: "Schism".to_string(),
            artists: vec![
                ArtistRef { id: "a1".to_string(), name: "Tool".to_string() },
                ArtistRef { id: "a9".to_string(), name: "Guest".to_string() },
            ],
            album: CatalogAlbum {
                name: "Lateralus".to_string(),
                images: vec![CatalogImage { url: "https://img/1".to_string(), height: None, width: None }],
            },
            duration_ms: 403_000,
            preview_url: None,
        };

        let shaped = CandidateTrack::from_catalog(&track, true).unwrap();
        assert_eq!(shaped.artist, "Tool");
        assert_eq!(shaped.artist_id, "a1");
        assert_eq!(shaped.image.as_deref(), Some("https://img/1"));
        assert!(shaped.is_discovery);
    }

    #[test]
    fn test_from_catalog_without_artist_is_dropped() {
        let track = CatalogTrack {
            uri: "spotify:track:2".to_string(),
            name: "Untitled".to_string(),
            artists: vec![],
            album: CatalogAlbum::default(),
            duration_ms: 0,
            preview_url: None,
        };
        assert!(CandidateTrack::from_catalog(&track, false).is_none());
    }

    #[test]
    fn test_summary_counts_and_merge() {
        let mut a = DiscoverySummary::default();
        a.record_skip(&SkipReason::SeedArtist);
        a.record_skip(&SkipReason::Blocked { genre: "reggaeton".to_string() });
        a.artists_accepted = 2;

        let mut b = DiscoverySummary::default();
        b.record_skip(&SkipReason::SeedArtist);
        b.artists_accepted = 1;

        a.merge_counts(&b);
        assert_eq!(a.artists_accepted, 3);
        assert_eq!(a.skipped["seed_artist"], 2);
        assert_eq!(a.skipped["blocked_genre"], 1);
        assert_eq!(a.skipped_total(), 3);
    }
}
