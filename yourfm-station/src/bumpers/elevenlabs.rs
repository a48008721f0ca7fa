//! ElevenLabs speech synthesis client

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use yourfm_common::config::ElevenLabsConfig;

use super::{BumperError, SpeechSynthesizer, Voice};

/// Expressive delivery suited to radio
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,
    pub use_speaker_boost: bool,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: 0.4,
            similarity_boost: 0.8,
            style: 0.6,
            use_speaker_boost: true,
        }
    }
}

#[derive(Debug, Serialize)]
struct TextToSpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: &'a VoiceSettings,
}

#[derive(Debug, Deserialize)]
struct VoicesResponse {
    #[serde(default)]
    voices: Vec<Voice>,
}

/// ElevenLabs API client
pub struct ElevenLabsClient {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
    model_id: String,
    voice_settings: VoiceSettings,
}

impl ElevenLabsClient {
    pub fn new(config: &ElevenLabsConfig) -> Result<Self, BumperError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(BumperError::NotConfigured("ElevenLabs"))?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| BumperError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model_id: config.model_id.clone(),
            voice_settings: VoiceSettings::default(),
        })
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, BumperError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let error_text = response.text().await.unwrap_or_default();
        tracing::warn!(status = %status, "ElevenLabs request failed: {}", error_text);
        Err(BumperError::Api(status.as_u16(), error_text))
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsClient {
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<Vec<u8>, BumperError> {
        let body = TextToSpeechRequest {
            text,
            model_id: &self.model_id,
            voice_settings: &self.voice_settings,
        };

        let response = self
            .http_client
            .post(format!("{}/text-to-speech/{}", self.base_url, voice_id))
            .header("xi-api-key", &self.api_key)
            .header(reqwest::header::ACCEPT, "audio/mpeg")
            .json(&body)
            .send()
            .await
            .map_err(|e| BumperError::Network(e.to_string()))?;

        let audio = Self::check(response)
            .await?
            .bytes()
            .await
            .map_err(|e| BumperError::Network(e.to_string()))?;

        if audio.is_empty() {
            return Err(BumperError::EmptyResponse("ElevenLabs"));
        }
        Ok(audio.to_vec())
    }

    async fn list_voices(&self) -> Result<Vec<Voice>, BumperError> {
        let response = self
            .http_client
            .get(format!("{}/voices", self.base_url))
            .header("xi-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| BumperError::Network(e.to_string()))?;

        let parsed: VoicesResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| BumperError::Parse(e.to_string()))?;

        Ok(parsed.voices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_api_key() {
        assert!(matches!(
            ElevenLabsClient::new(&ElevenLabsConfig::default()),
            Err(BumperError::NotConfigured("ElevenLabs"))
        ));
    }

    #[test]
    fn test_tts_body_carries_voice_settings() {
        let settings = VoiceSettings::default();
        let body = TextToSpeechRequest {
            text: "hi",
            model_id: "eleven_turbo_v2_5",
            voice_settings: &settings,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model_id"], "eleven_turbo_v2_5");
        assert_eq!(json["voice_settings"]["use_speaker_boost"], true);
        assert!((json["voice_settings"]["stability"].as_f64().unwrap() - 0.4).abs() < 1e-6);
        assert!((json["voice_settings"]["style"].as_f64().unwrap() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_parse_voices_response() {
        let parsed: VoicesResponse = serde_json::from_str(
            r#"{"voices":[
                {"voice_id":"v1","name":"Rachel","category":"premade","labels":{"accent":"american"}},
                {"voice_id":"v2","name":"My DJ","category":"cloned","description":"late night"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(parsed.voices.len(), 2);
        assert!(!parsed.voices[0].is_owned());
        assert!(parsed.voices[1].is_owned());
        assert_eq!(parsed.voices[1].description.as_deref(), Some("late night"));
    }
}
