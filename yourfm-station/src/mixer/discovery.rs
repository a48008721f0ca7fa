//! Candidate discovery
//!
//! Builds the two track pools a mix is assembled from:
//! - the selected pool: top tracks of the seed artists
//! - the discovery pool: top tracks of genre-compatible artists found through
//!   genre-scoped catalog searches, never by a seed artist
//!
//! Every catalog call runs under a per-call timeout. A failed or timed-out
//! item is recorded as a skip and discovery carries on; only an
//! authentication failure aborts the whole run.

use futures::stream::{self, StreamExt, TryStreamExt};
use rand::seq::SliceRandom;
use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use yourfm_common::config::MixerConfig;

use super::genre_rules::{genre_overlaps, normalize_genre, GenreRules};
use super::types::{CandidateTrack, DiscoverySummary, ItemOutcome, SeedArtistInput, SkipReason};
use crate::catalog::{CatalogClient, CatalogError, CatalogTrack};

/// Seed artists known by id and by lowercase name
#[derive(Debug, Clone, Default)]
pub struct SeedSet {
    ids: Vec<String>,
    id_set: HashSet<String>,
    names: HashSet<String>,
}

impl SeedSet {
    pub fn new(inputs: &[SeedArtistInput]) -> Self {
        let mut set = Self::default();
        for input in inputs {
            let id = input.id().trim();
            if !id.is_empty() && set.id_set.insert(id.to_string()) {
                set.ids.push(id.to_string());
            }
            if let Some(name) = input.name() {
                set.add_name(name);
            }
        }
        set
    }

    pub fn add_name(&mut self, name: &str) {
        let name = name.trim().to_lowercase();
        if !name.is_empty() {
            self.names.insert(name);
        }
    }

    /// Seed ids in request order
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Matches by id, or by name ignoring case
    pub fn contains(&self, artist_id: &str, artist_name: &str) -> bool {
        self.id_set.contains(artist_id) || self.names.contains(&artist_name.trim().to_lowercase())
    }
}

/// Seed set after catalog lookup, plus the genres the seeds report
#[derive(Debug, Clone, Default)]
pub struct ResolvedSeeds {
    pub seeds: SeedSet,
    pub genres: Vec<String>,
}

/// Seed genres first, then station genres, deduplicated in first-seen order
pub fn target_genres(seed_genres: &[String], station_genres: &[String], max: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    seed_genres
        .iter()
        .chain(station_genres.iter())
        .filter_map(|genre| {
            let key = normalize_genre(genre);
            if key.is_empty() || !seen.insert(key) {
                return None;
            }
            Some(genre.trim().to_string())
        })
        .take(max)
        .collect()
}

fn skip_reason(error: &CatalogError) -> SkipReason {
    match error {
        CatalogError::Timeout => SkipReason::TimedOut,
        other => SkipReason::Upstream(other.to_string()),
    }
}

/// Discovery pool shared by the per-genre workers
struct PoolState {
    tracks: Vec<CandidateTrack>,
    seen_uris: HashSet<String>,
    limit: usize,
}

impl PoolState {
    fn is_full(&self) -> bool {
        self.tracks.len() >= self.limit
    }

    /// Add a catalog track unless it is malformed, by a seed, or already pooled
    fn offer(&mut self, track: &CatalogTrack, seeds: &SeedSet) -> ItemOutcome<()> {
        let candidate = match CandidateTrack::from_catalog(track, true) {
            Some(candidate) => candidate,
            None => return ItemOutcome::Skipped(SkipReason::Malformed),
        };
        if seeds.contains(&candidate.artist_id, &candidate.artist) {
            return ItemOutcome::Skipped(SkipReason::SeedArtist);
        }
        if !self.seen_uris.insert(candidate.uri.clone()) {
            return ItemOutcome::Skipped(SkipReason::DuplicateTrack);
        }
        self.tracks.push(candidate);
        ItemOutcome::Accepted(())
    }
}

/// Discovery output
#[derive(Debug, Clone, Default)]
pub struct DiscoveryResult {
    pub tracks: Vec<CandidateTrack>,
    pub summary: DiscoverySummary,
}

/// One discovery run against a catalog
pub struct Discovery<'a> {
    catalog: &'a dyn CatalogClient,
    config: &'a MixerConfig,
    rules: &'a GenreRules,
    timeout: Duration,
}

impl<'a> Discovery<'a> {
    pub fn new(catalog: &'a dyn CatalogClient, config: &'a MixerConfig, rules: &'a GenreRules) -> Self {
        Self {
            catalog,
            config,
            rules,
            timeout: yourfm_common::time::millis_to_duration(config.per_call_timeout_ms),
        }
    }

    fn concurrency(&self) -> usize {
        self.config.max_concurrent_fetches.max(1)
    }

    async fn timed<T, F>(&self, call: F) -> Result<T, CatalogError>
    where
        F: Future<Output = Result<T, CatalogError>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(CatalogError::Timeout),
        }
    }

    /// Look up the seed artists for canonical names and reported genres
    pub async fn resolve_seeds(&self, inputs: &[SeedArtistInput]) -> Result<ResolvedSeeds, CatalogError> {
        let mut seeds = SeedSet::new(inputs);
        let ids: Vec<String> = seeds
            .ids()
            .iter()
            .take(self.config.max_seed_artists)
            .cloned()
            .collect();

        // buffered keeps request order so seed genres stay first-seen ordered
        let lookups: Vec<(String, Result<_, CatalogError>)> = stream::iter(ids)
            .map(|id| async move {
                let result = self.timed(self.catalog.artist(&id)).await;
                (id, result)
            })
            .buffered(self.concurrency())
            .collect()
            .await;

        let mut genres = Vec::new();
        for (id, result) in lookups {
            match result {
                Ok(artist) => {
                    seeds.add_name(&artist.name);
                    genres.extend(artist.genres);
                }
                Err(e) if e.is_auth() => return Err(e),
                Err(e) => warn!(artist_id = %id, "Seed artist lookup failed: {}", e),
            }
        }

        Ok(ResolvedSeeds { seeds, genres })
    }

    /// Top tracks of up to `max_seed_artists` shuffled seeds
    pub async fn seed_pool(&self, seeds: &SeedSet) -> Result<DiscoveryResult, CatalogError> {
        let mut ids = seeds.ids().to_vec();
        ids.shuffle(&mut rand::thread_rng());
        ids.truncate(self.config.max_seed_artists);

        let fetched: Vec<(String, Result<Vec<CatalogTrack>, CatalogError>)> = stream::iter(ids)
            .map(|id| async move {
                let result = self.timed(self.catalog.top_tracks(&id)).await;
                (id, result)
            })
            .buffer_unordered(self.concurrency())
            .collect()
            .await;

        let mut result = DiscoveryResult::default();
        let mut seen = HashSet::new();

        for (id, tracks) in fetched {
            let mut tracks = match tracks {
                Ok(tracks) => tracks,
                Err(e) if e.is_auth() => return Err(e),
                Err(e) => {
                    debug!(artist_id = %id, "Seed top tracks skipped: {}", e);
                    result.summary.record_skip(&skip_reason(&e));
                    continue;
                }
            };

            tracks.shuffle(&mut rand::thread_rng());
            let mut taken = 0;
            for track in &tracks {
                if taken >= self.config.tracks_per_seed_artist {
                    break;
                }
                match CandidateTrack::from_catalog(track, false) {
                    Some(candidate) if seen.insert(candidate.uri.clone()) => {
                        result.tracks.push(candidate);
                        taken += 1;
                    }
                    Some(_) => result.summary.record_skip(&SkipReason::DuplicateTrack),
                    None => result.summary.record_skip(&SkipReason::Malformed),
                }
            }
        }

        result.summary.selected_pool_size = result.tracks.len();
        Ok(result)
    }

    /// Fill the discovery pool from genre searches until `limit` is reached
    ///
    /// `exclude_uris` holds tracks already in the selected pool.
    pub async fn discover(
        &self,
        seeds: &SeedSet,
        station_genres: &[String],
        target_genres: &[String],
        exclude_uris: HashSet<String>,
        limit: usize,
    ) -> Result<DiscoveryResult, CatalogError> {
        let pool = Mutex::new(PoolState {
            tracks: Vec::new(),
            seen_uris: exclude_uris,
            limit,
        });

        let searched: Vec<String> = target_genres
            .iter()
            .take(self.config.max_target_genres)
            .cloned()
            .collect();

        let pool_ref = &pool;
        let worker_summaries: Vec<DiscoverySummary> = stream::iter(searched.iter().cloned())
            .map(|genre| async move {
                self.search_genre(&genre, seeds, station_genres, target_genres, pool_ref)
                    .await
            })
            .buffer_unordered(self.concurrency())
            .try_collect()
            .await?;

        let mut summary = DiscoverySummary {
            target_genres: searched,
            ..DiscoverySummary::default()
        };
        for worker in &worker_summaries {
            summary.merge_counts(worker);
        }

        let tracks = pool.into_inner().tracks;
        summary.discovery_pool_size = tracks.len();
        Ok(DiscoveryResult { tracks, summary })
    }

    /// Screen one candidate artist against seeds and genre rules
    fn screen_artist(
        &self,
        artist_id: &str,
        artist_name: &str,
        genres: &[String],
        seeds: &SeedSet,
        station_genres: &[String],
        target_genres: &[String],
    ) -> ItemOutcome<()> {
        if seeds.contains(artist_id, artist_name) {
            return ItemOutcome::Skipped(SkipReason::SeedArtist);
        }
        if let Some(genre) = self.rules.blocking_genre(genres, station_genres) {
            return ItemOutcome::Skipped(SkipReason::Blocked { genre });
        }
        if !genre_overlaps(genres, target_genres) {
            return ItemOutcome::Skipped(SkipReason::NoGenreOverlap);
        }
        ItemOutcome::Accepted(())
    }

    async fn offer_all(
        &self,
        tracks: &[CatalogTrack],
        seeds: &SeedSet,
        pool: &Mutex<PoolState>,
        summary: &mut DiscoverySummary,
    ) {
        let mut pool = pool.lock().await;
        for track in tracks {
            if pool.is_full() {
                break;
            }
            if let ItemOutcome::Skipped(reason) = pool.offer(track, seeds) {
                summary.record_skip(&reason);
            }
        }
    }

    /// One genre: artist search, falling back to track search
    async fn search_genre(
        &self,
        genre: &str,
        seeds: &SeedSet,
        station_genres: &[String],
        target_genres: &[String],
        pool: &Mutex<PoolState>,
    ) -> Result<DiscoverySummary, CatalogError> {
        let mut summary = DiscoverySummary::default();
        if pool.lock().await.is_full() {
            return Ok(summary);
        }
        summary.genres_searched = 1;

        let artists = self
            .timed(
                self.catalog
                    .search_artists_by_genre(genre, self.config.artists_per_genre),
            )
            .await;

        let mut accepted = 0;
        match artists {
            Err(e) if e.is_auth() => return Err(e),
            Err(e) => {
                warn!(genre = %genre, "Artist search failed, using track search: {}", e);
                summary.record_skip(&skip_reason(&e));
            }
            Ok(mut artists) => {
                artists.shuffle(&mut rand::thread_rng());
                for artist in artists {
                    if pool.lock().await.is_full() {
                        break;
                    }
                    summary.candidates_considered += 1;

                    let outcome = self.screen_artist(
                        &artist.id,
                        &artist.name,
                        &artist.genres,
                        seeds,
                        station_genres,
                        target_genres,
                    );
                    if let ItemOutcome::Skipped(reason) = outcome {
                        debug!(genre = %genre, artist = %artist.name, reason = reason.kind(), "Candidate artist skipped");
                        summary.record_skip(&reason);
                        continue;
                    }
                    accepted += 1;

                    let mut tracks = match self.timed(self.catalog.top_tracks(&artist.id)).await {
                        Ok(tracks) => tracks,
                        Err(e) if e.is_auth() => return Err(e),
                        Err(e) => {
                            debug!(artist = %artist.name, "Top tracks skipped: {}", e);
                            summary.record_skip(&skip_reason(&e));
                            continue;
                        }
                    };
                    tracks.shuffle(&mut rand::thread_rng());
                    tracks.truncate(self.config.tracks_per_discovery_artist);
                    self.offer_all(&tracks, seeds, pool, &mut summary).await;
                }
            }
        }

        summary.artists_accepted = accepted;
        if accepted > 0 {
            return Ok(summary);
        }

        if pool.lock().await.is_full() {
            return Ok(summary);
        }

        debug!(genre = %genre, "No accepted artists, falling back to track search");
        let tracks = self
            .timed(
                self.catalog
                    .search_tracks_by_genre(genre, self.config.tracks_per_genre_search),
            )
            .await;

        let mut tracks = match tracks {
            Ok(tracks) => tracks,
            Err(e) if e.is_auth() => return Err(e),
            Err(e) => {
                warn!(genre = %genre, "Track search failed: {}", e);
                summary.record_skip(&skip_reason(&e));
                return Ok(summary);
            }
        };
        tracks.shuffle(&mut rand::thread_rng());

        // Search results carry no artist genres; the searched genre stands in
        let reported = vec![genre.to_string()];
        let mut screened = Vec::with_capacity(tracks.len());
        for track in tracks {
            summary.candidates_considered += 1;
            let (artist_id, artist_name) = match track.primary_artist() {
                Some(artist) => (artist.id.clone(), artist.name.clone()),
                None => {
                    summary.record_skip(&SkipReason::Malformed);
                    continue;
                }
            };
            match self.screen_artist(
                &artist_id,
                &artist_name,
                &reported,
                seeds,
                station_genres,
                target_genres,
            ) {
                ItemOutcome::Accepted(()) => screened.push(track),
                ItemOutcome::Skipped(reason) => summary.record_skip(&reason),
            }
        }
        self.offer_all(&screened, seeds, pool, &mut summary).await;

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ArtistRef, CatalogAlbum};
    use crate::mixer::types::SeedArtist;

    fn track(uri: &str, artist_id: &str, artist_name: &str) -> CatalogTrack {
        CatalogTrack {
            uri: uri.to_string(),
            name: format!("Song {}", uri),
            artists: vec![ArtistRef {
                id: artist_id.to_string(),
                name: artist_name.to_string(),
            }],
            album: CatalogAlbum::default(),
            duration_ms: 200_000,
            preview_url: None,
        }
    }

    #[test]
    fn test_seed_set_matches_id_and_name() {
        let seeds = SeedSet::new(&[
            SeedArtistInput::Artist(SeedArtist {
                id: "a1".to_string(),
                name: "Tool".to_string(),
            }),
            SeedArtistInput::Id("a2".to_string()),
            SeedArtistInput::Id("a2".to_string()),
        ]);
        assert_eq!(seeds.ids(), &["a1".to_string(), "a2".to_string()]);
        assert!(seeds.contains("a1", "whoever"));
        assert!(seeds.contains("zz", "  TOOL "));
        assert!(!seeds.contains("zz", "Opeth"));
    }

    #[test]
    fn test_target_genres_order_and_dedup() {
        let seed = vec!["Progressive Metal".to_string(), "metal".to_string()];
        let station = vec!["metal".to_string(), "hard-rock".to_string(), "hard rock".to_string()];
        assert_eq!(
            target_genres(&seed, &station, 6),
            vec!["Progressive Metal", "metal", "hard-rock"]
        );
        assert_eq!(target_genres(&seed, &station, 1), vec!["Progressive Metal"]);
    }

    #[test]
    fn test_pool_offer_rejects_seed_duplicate_and_malformed() {
        let seeds = SeedSet::new(&[SeedArtistInput::Id("seed".to_string())]);
        let mut pool = PoolState {
            tracks: Vec::new(),
            seen_uris: ["u0".to_string()].into_iter().collect(),
            limit: 10,
        };

        assert!(pool.offer(&track("u1", "x", "X"), &seeds).is_accepted());
        assert_eq!(
            pool.offer(&track("u1", "x", "X"), &seeds),
            ItemOutcome::Skipped(SkipReason::DuplicateTrack)
        );
        assert_eq!(
            pool.offer(&track("u0", "y", "Y"), &seeds),
            ItemOutcome::Skipped(SkipReason::DuplicateTrack)
        );
        assert_eq!(
            pool.offer(&track("u2", "seed", "Seed"), &seeds),
            ItemOutcome::Skipped(SkipReason::SeedArtist)
        );

        let mut bare = track("u3", "x", "X");
        bare.artists.clear();
        assert_eq!(pool.offer(&bare, &seeds), ItemOutcome::Skipped(SkipReason::Malformed));
        assert_eq!(pool.tracks.len(), 1);
        assert!(pool.tracks[0].is_discovery);
    }

    #[test]
    fn test_timeout_maps_to_timed_out_skip() {
        assert_eq!(skip_reason(&CatalogError::Timeout), SkipReason::TimedOut);
        assert_eq!(
            skip_reason(&CatalogError::Api(500, "boom".to_string())).kind(),
            "upstream_error"
        );
    }
}
