//! Runtime configuration
//!
//! Everything is sourced from the environment: required capability keys
//! plus tunables with defaults chosen for short rehearsal sessions.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use directories::ProjectDirs;

use crate::{Error, Result};

/// Per-reply output-length ceiling sent to the LLM
pub const DEFAULT_MAX_REPLY_TOKENS: u32 = 256;

/// History cap: system turn + most recent messages
pub const DEFAULT_MAX_HISTORY_MESSAGES: usize = 12;

/// Hard cap on tokens for one unattended rehearsal run
pub const DEFAULT_CONVERSATION_TOKEN_LIMIT: u32 = 3000;

const DEFAULT_RECORD_SECONDS: u64 = 10;
const DEFAULT_COUNTDOWN_SECONDS: u64 = 3;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// External capability credentials
    pub api_keys: ApiKeys,
    /// LLM and history settings
    pub chat: ChatConfig,
    /// STT/TTS models and mic loop timing
    pub voice: VoiceConfig,
    /// Timeout applied to every capability call, so a hung external
    /// service cannot hold a session lock indefinitely
    pub request_timeout: Duration,
    /// Directory reply artifacts are published to
    pub audio_out_dir: PathBuf,
}

/// API keys for the three external capabilities
#[derive(Debug, Clone)]
pub struct ApiKeys {
    pub deepgram: String,
    pub openai: String,
    pub elevenlabs: String,
}

/// LLM and conversation-history settings
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Chat model identifier
    pub model: String,
    /// Per-reply output-length ceiling
    pub max_reply_tokens: u32,
    /// History cap applied before each capability call
    pub max_history_messages: usize,
    /// Budget ceiling for one unattended run
    pub conversation_token_limit: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            max_reply_tokens: DEFAULT_MAX_REPLY_TOKENS,
            max_history_messages: DEFAULT_MAX_HISTORY_MESSAGES,
            conversation_token_limit: DEFAULT_CONVERSATION_TOKEN_LIMIT,
        }
    }
}

/// Speech capability models and rehearsal-loop timing
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// STT model (Deepgram)
    pub stt_model: String,
    /// TTS model (ElevenLabs)
    pub tts_model: String,
    /// Speaking time per rehearsal round
    pub record_seconds: u64,
    /// Countdown before recording starts
    pub countdown_seconds: u64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            stt_model: "nova-2".to_string(),
            tts_model: "eleven_multilingual_v2".to_string(),
            record_seconds: DEFAULT_RECORD_SECONDS,
            countdown_seconds: DEFAULT_COUNTDOWN_SECONDS,
        }
    }
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// Required: `DEEPGRAM_API_KEY`, `OPENAI_API_KEY`, `ELEVEN_API_KEY`.
    /// Tunables use `PITCH_*` variables and fall back to defaults.
    ///
    /// # Errors
    ///
    /// Returns error when a required key is missing or a tunable fails to
    /// parse
    pub fn from_env() -> Result<Self> {
        let api_keys = ApiKeys {
            deepgram: required_env("DEEPGRAM_API_KEY")?,
            openai: required_env("OPENAI_API_KEY")?,
            elevenlabs: required_env("ELEVEN_API_KEY")?,
        };

        let chat = ChatConfig {
            model: optional_env("PITCH_CHAT_MODEL")
                .unwrap_or_else(|| ChatConfig::default().model),
            max_reply_tokens: parsed_env("PITCH_MAX_REPLY_TOKENS", DEFAULT_MAX_REPLY_TOKENS)?,
            max_history_messages: parsed_env(
                "PITCH_MAX_HISTORY_MESSAGES",
                DEFAULT_MAX_HISTORY_MESSAGES,
            )?,
            conversation_token_limit: parsed_env(
                "PITCH_CONVERSATION_TOKEN_LIMIT",
                DEFAULT_CONVERSATION_TOKEN_LIMIT,
            )?,
        };

        let voice = VoiceConfig {
            stt_model: optional_env("PITCH_STT_MODEL")
                .unwrap_or_else(|| VoiceConfig::default().stt_model),
            tts_model: optional_env("PITCH_TTS_MODEL")
                .unwrap_or_else(|| VoiceConfig::default().tts_model),
            record_seconds: parsed_env("PITCH_RECORD_SECONDS", DEFAULT_RECORD_SECONDS)?,
            countdown_seconds: parsed_env("PITCH_COUNTDOWN_SECONDS", DEFAULT_COUNTDOWN_SECONDS)?,
        };

        let request_timeout = Duration::from_secs(parsed_env(
            "PITCH_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?);

        let audio_out_dir = optional_env("PITCH_AUDIO_DIR")
            .map_or_else(default_audio_dir, PathBuf::from);

        Ok(Self {
            api_keys,
            chat,
            voice,
            request_timeout,
            audio_out_dir,
        })
    }
}

/// Default artifact directory under the platform data dir, with a local
/// fallback when no home directory is resolvable
fn default_audio_dir() -> PathBuf {
    ProjectDirs::from("dev", "pitchlab", "pitch-gateway").map_or_else(
        || PathBuf::from("audio_out"),
        |dirs| dirs.data_dir().join("audio_out"),
    )
}

fn required_env(key: &str) -> Result<String> {
    match std::env::var(key) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(Error::Config(format!("{key} not set"))),
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn parsed_env<T: FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value
            .parse()
            .map_err(|e| Error::Config(format!("invalid {key}: {e}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_rehearsal_tuning() {
        let chat = ChatConfig::default();
        assert_eq!(chat.model, "gpt-4o-mini");
        assert_eq!(chat.max_reply_tokens, 256);
        assert_eq!(chat.max_history_messages, 12);
        assert_eq!(chat.conversation_token_limit, 3000);

        let voice = VoiceConfig::default();
        assert_eq!(voice.stt_model, "nova-2");
        assert_eq!(voice.tts_model, "eleven_multilingual_v2");
        assert_eq!(voice.record_seconds, 10);
        assert_eq!(voice.countdown_seconds, 3);
    }

    #[test]
    fn audio_dir_always_resolves() {
        assert!(!default_audio_dir().as_os_str().is_empty());
    }
}
