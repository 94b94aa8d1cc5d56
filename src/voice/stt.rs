//! Speech-to-text capability

use std::time::Duration;

use async_trait::async_trait;

use crate::{Error, Result};

/// Response from the Deepgram listen API
#[derive(serde::Deserialize)]
struct ListenResponse {
    results: ListenResults,
}

#[derive(serde::Deserialize)]
struct ListenResults {
    channels: Vec<ListenChannel>,
}

#[derive(serde::Deserialize)]
struct ListenChannel {
    alternatives: Vec<ListenAlternative>,
}

#[derive(serde::Deserialize)]
struct ListenAlternative {
    transcript: String,
}

/// Normalize a browser-supplied MIME hint to the small set the STT service
/// understands. Unrecognized hints pass through as given.
#[must_use]
pub fn normalize_content_type(hint: &str) -> String {
    let lower = hint.to_ascii_lowercase();
    if lower.contains("webm") {
        "audio/webm".to_string()
    } else if lower.contains("mp4") || lower.contains("m4a") {
        "audio/mp4".to_string()
    } else if lower.contains("wav") {
        "audio/wav".to_string()
    } else if lower.contains("mp3") || lower.contains("mpeg") {
        "audio/mp3".to_string()
    } else {
        hint.to_string()
    }
}

/// Converts spoken audio to text
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribe audio to text, trimmed of surrounding whitespace.
    ///
    /// An empty transcript means the service heard no speech. Transport
    /// failures, non-success statuses, and unparseable bodies surface as
    /// [`Error::Transcription`]; raw transport errors never escape.
    async fn transcribe(&self, audio: &[u8], content_type: &str) -> Result<String>;
}

/// Deepgram-backed transcription client
pub struct DeepgramTranscriber {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl DeepgramTranscriber {
    /// Create a new transcription client
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing or the client cannot be built
    pub fn new(api_key: String, model: String, timeout: Duration) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("Deepgram API key required".to_string()));
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_key,
            model,
        })
    }
}

#[async_trait]
impl SpeechToText for DeepgramTranscriber {
    async fn transcribe(&self, audio: &[u8], content_type: &str) -> Result<String> {
        let content_type = normalize_content_type(content_type);
        tracing::debug!(
            audio_bytes = audio.len(),
            content_type = %content_type,
            "starting transcription"
        );

        let url = format!(
            "https://api.deepgram.com/v1/listen?model={}&smart_format=true&punctuate=true",
            self.model
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Token {}", self.api_key))
            .header("Content-Type", content_type)
            .body(audio.to_vec())
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "STT request failed");
                Error::Transcription(format!("request failed: {e}"))
            })?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "STT API error");
            return Err(Error::Transcription(format!(
                "Deepgram error {status}: {body}"
            )));
        }

        let result: ListenResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse STT response");
            Error::Transcription(format!("unparseable response: {e}"))
        })?;

        let transcript = result
            .results
            .channels
            .first()
            .and_then(|c| c.alternatives.first())
            .map(|a| a.transcript.trim().to_string())
            .unwrap_or_default();

        tracing::info!(transcript = %transcript, "transcription complete");
        Ok(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_content_types_normalize() {
        assert_eq!(normalize_content_type("audio/webm;codecs=opus"), "audio/webm");
        assert_eq!(normalize_content_type("audio/mp4"), "audio/mp4");
        assert_eq!(normalize_content_type("audio/x-m4a"), "audio/mp4");
        assert_eq!(normalize_content_type("audio/WAV"), "audio/wav");
        assert_eq!(normalize_content_type("audio/mpeg"), "audio/mp3");
    }

    #[test]
    fn unknown_content_types_pass_through() {
        assert_eq!(normalize_content_type("audio/ogg"), "audio/ogg");
    }

    #[test]
    fn listen_response_parses_transcript() {
        let body = r#"{
            "results": {
                "channels": [
                    { "alternatives": [ { "transcript": " hello there " } ] }
                ]
            }
        }"#;
        let parsed: ListenResponse = serde_json::from_str(body).unwrap();
        let transcript = parsed
            .results
            .channels
            .first()
            .and_then(|c| c.alternatives.first())
            .map(|a| a.transcript.trim().to_string())
            .unwrap_or_default();
        assert_eq!(transcript, "hello there");
    }

    #[test]
    fn empty_channels_yield_empty_transcript() {
        let body = r#"{ "results": { "channels": [] } }"#;
        let parsed: ListenResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.results.channels.is_empty());
    }

    #[test]
    fn missing_api_key_is_rejected() {
        let err = DeepgramTranscriber::new(
            String::new(),
            "nova-2".to_string(),
            Duration::from_secs(30),
        );
        assert!(matches!(err, Err(Error::Config(_))));
    }
}
