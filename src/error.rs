//! Error types for the pitch gateway

use thiserror::Error;

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline stage at which a conversational turn failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStage {
    /// Input validation, before any capability call
    Validation,
    /// Speech-to-text
    Transcription,
    /// LLM reply generation
    Generation,
    /// Text-to-speech and artifact publishing
    Synthesis,
}

impl std::fmt::Display for TurnStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Validation => "validation",
            Self::Transcription => "transcription",
            Self::Generation => "generation",
            Self::Synthesis => "synthesis",
        };
        f.write_str(name)
    }
}

/// Errors that can occur in the pitch gateway
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Missing or malformed turn input
    #[error("validation error: {0}")]
    Validation(String),

    /// STT capability error or unparseable transcript
    #[error("transcription failed: {0}")]
    Transcription(String),

    /// LLM capability error or empty reply
    #[error("generation failed: {0}")]
    Generation(String),

    /// TTS capability error or unusable audio artifact
    #[error("synthesis failed: {0}")]
    Synthesis(String),

    /// Requested artifact or session absent where absence is not expected
    #[error("not found: {0}")]
    NotFound(String),

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Unexpected failure in orchestration
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// The turn-pipeline stage this error is tagged with, if any.
    ///
    /// Stage-tagged failures are never retried by the pipeline itself;
    /// the caller decides whether to retry the whole turn.
    #[must_use]
    pub const fn stage(&self) -> Option<TurnStage> {
        match self {
            Self::Validation(_) => Some(TurnStage::Validation),
            Self::Transcription(_) => Some(TurnStage::Transcription),
            Self::Generation(_) => Some(TurnStage::Generation),
            Self::Synthesis(_) => Some(TurnStage::Synthesis),
            _ => None,
        }
    }
}
