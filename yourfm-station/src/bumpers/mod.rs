//! Bumper generation
//!
//! A bumper is a short spoken DJ announcement between tracks. The text comes
//! from a [`TextGenerator`], is sanitized against a template fallback, and is
//! rendered to MP3 by a [`SpeechSynthesizer`].

pub mod elevenlabs;
pub mod gemini;
pub mod prompt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mixer::SeedArtist;

pub use elevenlabs::ElevenLabsClient;
pub use gemini::GeminiClient;
pub use prompt::{build_prompt, sanitize_response, template_text, DJ_SYSTEM_INSTRUCTION};

/// Errors from the text and speech services
#[derive(Debug, Error)]
pub enum BumperError {
    #[error("{0} API key not configured")]
    NotConfigured(&'static str),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Empty response from {0}")]
    EmptyResponse(&'static str),
}

/// Synthetic voice offered for a station
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Voice {
    pub voice_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Voice categories owned by the account (not premade library voices)
pub const OWNED_VOICE_CATEGORIES: [&str; 3] = ["cloned", "generated", "professional"];

impl Voice {
    pub fn is_owned(&self) -> bool {
        self.category
            .as_deref()
            .is_some_and(|c| OWNED_VOICE_CATEGORIES.contains(&c))
    }
}

/// Produces DJ text from a prompt
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, system_instruction: &str, prompt: &str) -> Result<String, BumperError>;
}

/// Renders text to speech and lists available voices
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// MP3 bytes for `text` spoken by `voice_id`
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<Vec<u8>, BumperError>;

    async fn list_voices(&self) -> Result<Vec<Voice>, BumperError>;
}

/// Bumper request body
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BumperRequest {
    pub station_id: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub artists: Vec<SeedArtist>,
    pub voice_id: String,
    #[serde(default)]
    pub current_track_name: Option<String>,
    #[serde(default)]
    pub current_track_artist: Option<String>,
    #[serde(default)]
    pub next_track_name: Option<String>,
    #[serde(default)]
    pub next_track_artist: Option<String>,
}

/// Finished bumper, audio still raw
#[derive(Debug, Clone)]
pub struct GeneratedBumper {
    pub text: String,
    pub audio: Vec<u8>,
}

/// Generate text for `request`, sanitize it, and synthesize the audio
pub async fn generate_bumper(
    text_generator: &dyn TextGenerator,
    synthesizer: &dyn SpeechSynthesizer,
    request: &BumperRequest,
) -> Result<GeneratedBumper, BumperError> {
    let prompt = build_prompt(request);
    tracing::info!(station_id = %request.station_id, "Bumper prompt: {}", prompt);

    let raw = text_generator.generate(DJ_SYSTEM_INSTRUCTION, &prompt).await?;
    tracing::debug!("Bumper text response: {}", raw);

    let text = sanitize_response(&raw, request);
    let audio = synthesizer.synthesize(&text, &request.voice_id).await?;

    tracing::info!(
        station_id = %request.station_id,
        bytes = audio.len(),
        "Bumper generated"
    );

    Ok(GeneratedBumper { text, audio })
}
