use crate::config::Config;
use crate::error::{IntrospectError, Result};
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

const MODEL_ID: &str = "eleven_multilingual_v2";

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'static str,
    voice_settings: VoiceSettings,
}

#[derive(Debug, Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
    use_speaker_boost: bool,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: 0.5,
            similarity_boost: 0.75,
            use_speaker_boost: true,
        }
    }
}

/// Text-to-speech client
#[derive(Clone)]
pub struct SpeechClient {
    client: Client,
    api_key: Option<String>,
    api_base: String,
    voice_id: String,
}

impl SpeechClient {
    /// Builds a client from the application configuration
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_base_url(
            &config.endpoints.elevenlabs_api,
            &config.endpoints.elevenlabs_voice_id,
            config.api_keys.elevenlabs_api_key.clone(),
            config.timeouts.speech(),
        )
    }

    /// Builds a client against an arbitrary API root
    pub fn with_base_url(api_base: &str, voice_id: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IntrospectError::Network(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
            voice_id: voice_id.to_string(),
        })
    }

    /// Renders `text` as MP3 audio
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| IntrospectError::Config("ELEVENLABS_API_KEY not set".into()))?;

        let url = format!("{}/text-to-speech/{}", self.api_base, self.voice_id);
        debug!(voice = %self.voice_id, chars = text.len(), "requesting speech");

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", api_key)
            .header(ACCEPT, "audio/mpeg")
            .json(&SpeechRequest {
                text,
                model_id: MODEL_ID,
                voice_settings: VoiceSettings::default(),
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IntrospectError::Api {
                service: "elevenlabs",
                url,
                status: status.as_u16(),
                body,
            });
        }

        let audio = response.bytes().await?.to_vec();
        info!(voice = %self.voice_id, bytes = audio.len(), "synthesized speech");
        Ok(audio)
    }
}
