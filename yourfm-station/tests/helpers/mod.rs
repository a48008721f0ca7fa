//! Shared fixtures: an in-memory catalog and fake speech services
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use yourfm_station::api::analysis::{AnalysisError, TrackAnalysis, TrackAnalyzer};
use yourfm_station::bumpers::{BumperError, SpeechSynthesizer, TextGenerator, Voice};
use yourfm_station::catalog::{
    ArtistRef, CatalogAlbum, CatalogArtist, CatalogClient, CatalogConnector, CatalogError,
    CatalogTrack,
};

pub fn artist(id: &str, name: &str, genres: &[&str]) -> CatalogArtist {
    CatalogArtist {
        id: id.to_string(),
        name: name.to_string(),
        genres: genres.iter().map(|g| g.to_string()).collect(),
        popularity: 50,
        images: vec![],
    }
}

pub fn track(uri: &str, artist_id: &str, artist_name: &str) -> CatalogTrack {
    CatalogTrack {
        uri: uri.to_string(),
        name: format!("Song {}", uri),
        artists: vec![ArtistRef {
            id: artist_id.to_string(),
            name: artist_name.to_string(),
        }],
        album: CatalogAlbum {
            name: format!("Album of {}", artist_name),
            images: vec![],
        },
        duration_ms: 180_000,
        preview_url: None,
    }
}

/// `count` tracks by one artist with URIs `spotify:track:<artist_id>-<n>`
pub fn tracks_for(artist_id: &str, artist_name: &str, count: usize) -> Vec<CatalogTrack> {
    (0..count)
        .map(|i| track(&format!("spotify:track:{}-{}", artist_id, i), artist_id, artist_name))
        .collect()
}

/// Catalog answering from fixed tables
#[derive(Default)]
pub struct FakeCatalog {
    artists: HashMap<String, CatalogArtist>,
    top_tracks: HashMap<String, Vec<CatalogTrack>>,
    artists_by_genre: HashMap<String, Vec<CatalogArtist>>,
    tracks_by_genre: HashMap<String, Vec<CatalogTrack>>,
    failing: HashSet<String>,
    slow: HashSet<String>,
    unauthorized: bool,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an artist together with its top tracks
    pub fn with_artist(mut self, artist: CatalogArtist, tracks: Vec<CatalogTrack>) -> Self {
        self.top_tracks.insert(artist.id.clone(), tracks);
        self.artists.insert(artist.id.clone(), artist);
        self
    }

    /// Artists returned by an artist search for `genre`
    pub fn with_genre_artists(mut self, genre: &str, artists: Vec<CatalogArtist>) -> Self {
        self.artists_by_genre.insert(genre.to_string(), artists);
        self
    }

    pub fn with_genre_tracks(mut self, genre: &str, tracks: Vec<CatalogTrack>) -> Self {
        self.tracks_by_genre.insert(genre.to_string(), tracks);
        self
    }

    /// Top-track lookups for this artist fail with a server error
    pub fn failing(mut self, artist_id: &str) -> Self {
        self.failing.insert(artist_id.to_string());
        self
    }

    /// Top-track lookups for this artist never finish in time
    pub fn slow(mut self, artist_id: &str) -> Self {
        self.slow.insert(artist_id.to_string());
        self
    }

    /// Every call is rejected as unauthenticated
    pub fn unauthorized(mut self) -> Self {
        self.unauthorized = true;
        self
    }

    fn check_auth(&self) -> Result<(), CatalogError> {
        if self.unauthorized {
            return Err(CatalogError::Unauthenticated);
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogClient for FakeCatalog {
    async fn artist(&self, artist_id: &str) -> Result<CatalogArtist, CatalogError> {
        self.check_auth()?;
        self.artists
            .get(artist_id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(artist_id.to_string()))
    }

    async fn search_artists(
        &self,
        query: &str,
        genre: Option<&str>,
        limit: usize,
    ) -> Result<Vec<CatalogArtist>, CatalogError> {
        self.check_auth()?;
        let query = query.to_lowercase();
        let mut found: Vec<CatalogArtist> = self
            .artists
            .values()
            .filter(|a| a.name.to_lowercase().contains(&query))
            .filter(|a| genre.map_or(true, |g| a.genres.iter().any(|ag| ag == g)))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        found.truncate(limit);
        Ok(found)
    }

    async fn search_artists_by_genre(
        &self,
        genre: &str,
        limit: usize,
    ) -> Result<Vec<CatalogArtist>, CatalogError> {
        self.check_auth()?;
        let mut found = self.artists_by_genre.get(genre).cloned().unwrap_or_default();
        found.truncate(limit);
        Ok(found)
    }

    async fn search_tracks_by_genre(
        &self,
        genre: &str,
        limit: usize,
    ) -> Result<Vec<CatalogTrack>, CatalogError> {
        self.check_auth()?;
        let mut found = self.tracks_by_genre.get(genre).cloned().unwrap_or_default();
        found.truncate(limit);
        Ok(found)
    }

    async fn top_tracks(&self, artist_id: &str) -> Result<Vec<CatalogTrack>, CatalogError> {
        self.check_auth()?;
        if self.slow.contains(artist_id) {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        if self.failing.contains(artist_id) {
            return Err(CatalogError::Api(500, "boom".to_string()));
        }
        Ok(self.top_tracks.get(artist_id).cloned().unwrap_or_default())
    }
}

/// Connector handing out one shared fake, recording the tokens it saw
pub struct FakeConnector {
    catalog: Arc<FakeCatalog>,
    pub tokens: std::sync::Mutex<Vec<String>>,
}

impl FakeConnector {
    pub fn new(catalog: FakeCatalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
            tokens: std::sync::Mutex::new(Vec::new()),
        }
    }
}

impl CatalogConnector for FakeConnector {
    fn connect(&self, access_token: &str) -> Arc<dyn CatalogClient> {
        self.tokens.lock().unwrap().push(access_token.to_string());
        self.catalog.clone()
    }
}

pub struct FakeTextGenerator(pub String);

#[async_trait]
impl TextGenerator for FakeTextGenerator {
    async fn generate(&self, _system: &str, _prompt: &str) -> Result<String, BumperError> {
        Ok(self.0.clone())
    }
}

pub struct FakeSynthesizer {
    pub voices: Vec<Voice>,
}

#[async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    async fn synthesize(&self, _text: &str, _voice_id: &str) -> Result<Vec<u8>, BumperError> {
        Ok(b"ID3fake".to_vec())
    }

    async fn list_voices(&self) -> Result<Vec<Voice>, BumperError> {
        Ok(self.voices.clone())
    }
}

pub fn voice(id: &str, name: &str, category: &str) -> Voice {
    Voice {
        voice_id: id.to_string(),
        name: name.to_string(),
        description: None,
        category: Some(category.to_string()),
    }
}

/// Analyzer answering every lookup with one result, recording the queries
pub struct FakeAnalyzer {
    result: Result<TrackAnalysis, u16>,
    pub queries: std::sync::Mutex<Vec<(String, String)>>,
}

impl FakeAnalyzer {
    pub fn returning(analysis: TrackAnalysis) -> Self {
        Self {
            result: Ok(analysis),
            queries: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Every lookup fails with this upstream status
    pub fn failing(status: u16) -> Self {
        Self {
            result: Err(status),
            queries: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl TrackAnalyzer for FakeAnalyzer {
    async fn analyze(&self, song: &str, artist: &str) -> Result<TrackAnalysis, AnalysisError> {
        self.queries
            .lock()
            .unwrap()
            .push((song.to_string(), artist.to_string()));
        match &self.result {
            Ok(analysis) => Ok(analysis.clone()),
            Err(status) => Err(AnalysisError::Api(*status, "upstream down".to_string())),
        }
    }
}
