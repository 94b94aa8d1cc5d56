//! Text-to-speech capability

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;

use crate::persona::VoiceProfile;
use crate::{Error, Result};

/// Synthesizes speech from text with a persona-fixed voice
#[async_trait]
pub trait TextToSpeech: Send + Sync {
    /// Synthesize text to MP3 audio bytes.
    ///
    /// Never returns an empty payload: a zero-byte result from the service
    /// is reported as [`Error::Synthesis`].
    async fn synthesize(&self, text: &str, voice: &VoiceProfile) -> Result<Vec<u8>>;
}

/// ElevenLabs-backed speech synthesizer
pub struct ElevenLabsSynthesizer {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl ElevenLabsSynthesizer {
    /// Create a new synthesizer
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing or the client cannot be built
    pub fn new(api_key: String, model: String, timeout: Duration) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("ElevenLabs API key required".to_string()));
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_key,
            model,
        })
    }
}

#[derive(serde::Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(serde::Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
}

#[async_trait]
impl TextToSpeech for ElevenLabsSynthesizer {
    async fn synthesize(&self, text: &str, voice: &VoiceProfile) -> Result<Vec<u8>> {
        tracing::debug!(chars = text.len(), voice = voice.voice_id, "starting synthesis");

        let url = format!(
            "https://api.elevenlabs.io/v1/text-to-speech/{}",
            voice.voice_id
        );

        let request = SpeechRequest {
            text,
            model_id: &self.model,
            voice_settings: VoiceSettings {
                stability: voice.stability,
                similarity_boost: voice.similarity_boost,
            },
        };

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "TTS request failed");
                Error::Synthesis(format!("request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "TTS API error");
            return Err(Error::Synthesis(format!(
                "ElevenLabs error {status}: {body}"
            )));
        }

        // Drain the body in chunks rather than buffering the whole response
        // in the HTTP layer.
        let mut stream = response.bytes_stream();
        let mut audio = Vec::new();
        while let Some(chunk) = stream.next().await {
            let chunk =
                chunk.map_err(|e| Error::Synthesis(format!("stream interrupted: {e}")))?;
            audio.extend_from_slice(&chunk);
        }

        if audio.is_empty() {
            return Err(Error::Synthesis(
                "service returned zero bytes of audio".to_string(),
            ));
        }

        tracing::info!(audio_bytes = audio.len(), "synthesis complete");
        Ok(audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speech_request_serializes_voice_settings() {
        let request = SpeechRequest {
            text: "hello",
            model_id: "eleven_multilingual_v2",
            voice_settings: VoiceSettings {
                stability: 0.6,
                similarity_boost: 0.85,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["text"], "hello");
        assert_eq!(json["model_id"], "eleven_multilingual_v2");
        assert!((json["voice_settings"]["stability"].as_f64().unwrap() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn missing_api_key_is_rejected() {
        let err = ElevenLabsSynthesizer::new(
            String::new(),
            "eleven_multilingual_v2".to_string(),
            Duration::from_secs(30),
        );
        assert!(matches!(err, Err(Error::Config(_))));
    }
}
