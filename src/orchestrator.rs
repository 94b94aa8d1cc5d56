//! Turn orchestration: transcribe → generate → synthesize
//!
//! One turn walks the pipeline
//!
//! ```text
//! Received → Transcribing → Transcribed → Generating → Generated
//!          → Synthesizing → Done
//! ```
//!
//! with a stage-tagged failure reachable from any non-terminal state. The
//! three capability calls run strictly in sequence (each stage's output is
//! the next stage's input) and no stage is retried here; whether to retry
//! the whole turn is the caller's decision. The session lock spans the
//! turn, so a second request for the same session id queues instead of
//! racing on the history.

use std::sync::Arc;

use crate::artifacts::ArtifactStore;
use crate::generate::ReplyGenerator;
use crate::persona::CaseStudy;
use crate::session::SessionStore;
use crate::voice::{SpeechToText, TextToSpeech};
use crate::{Error, Result};

/// Inputs for one conversational turn
#[derive(Debug, Clone)]
pub struct TurnRequest {
    /// Opaque conversation identifier
    pub session_id: String,
    /// Case-study id; unknown values fall back to the default persona
    pub case_study: String,
    /// Recorded speech payload
    pub audio: Vec<u8>,
    /// MIME hint for the payload
    pub content_type: String,
}

/// Outputs of a completed turn
#[derive(Debug, Clone)]
pub struct TurnResult {
    /// What the caller said
    pub transcript: String,
    /// The persona's reply
    pub reply: String,
    /// Artifact id resolving to the spoken reply
    pub audio_id: String,
    /// Tokens consumed by the generation call
    pub tokens_used: u32,
}

/// Drives the three-stage turn pipeline over a session store
pub struct Orchestrator {
    sessions: Arc<SessionStore>,
    stt: Arc<dyn SpeechToText>,
    generator: ReplyGenerator,
    tts: Arc<dyn TextToSpeech>,
    artifacts: ArtifactStore,
}

impl Orchestrator {
    /// Assemble the pipeline from its capabilities
    pub fn new(
        sessions: Arc<SessionStore>,
        stt: Arc<dyn SpeechToText>,
        generator: ReplyGenerator,
        tts: Arc<dyn TextToSpeech>,
        artifacts: ArtifactStore,
    ) -> Self {
        Self {
            sessions,
            stt,
            generator,
            tts,
            artifacts,
        }
    }

    /// The session store backing this orchestrator
    #[must_use]
    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// The artifact store replies are published to
    #[must_use]
    pub const fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Run one full turn.
    ///
    /// On success the returned audio id resolves to a non-empty artifact.
    /// On failure the error is tagged with the stage that failed; history
    /// is untouched by transcription failures, while generation and
    /// synthesis failures leave the turns appended so far in place
    /// (a failed turn still consumes an utterance slot).
    ///
    /// # Errors
    ///
    /// Returns a stage-tagged [`Error`] when any stage fails
    pub async fn run_turn(&self, request: TurnRequest) -> Result<TurnResult> {
        if request.audio.is_empty() {
            return Err(Error::Validation("no audio payload supplied".to_string()));
        }

        let case_study = CaseStudy::resolve(&request.case_study);
        let persona = case_study.persona();
        let session = self.sessions.get_or_create(&request.session_id, case_study);
        // One turn in flight per session: the guard spans all three stages.
        let mut session = session.lock().await;

        tracing::debug!(
            session_id = %request.session_id,
            case_study = %case_study,
            audio_bytes = request.audio.len(),
            "turn received"
        );

        let transcript = self
            .stt
            .transcribe(&request.audio, &request.content_type)
            .await?;
        if transcript.is_empty() {
            return Err(Error::Transcription("no speech detected".to_string()));
        }

        let (reply, tokens_used) = self.generator.generate(&mut session, &transcript).await?;

        let audio = self.tts.synthesize(&reply, &persona.voice).await?;
        let audio_id = output_id(&request.session_id);
        self.artifacts.write(&audio_id, &audio)?;

        tracing::info!(
            session_id = %request.session_id,
            audio_id = %audio_id,
            tokens_used,
            session_tokens = session.tokens_used(),
            "turn complete"
        );

        Ok(TurnResult {
            transcript,
            reply,
            audio_id,
            tokens_used,
        })
    }
}

/// Unique, path-safe artifact id for a turn: sanitized session id plus
/// the current unix-millis timestamp. Re-derivable paths, unique per turn.
fn output_id(session_id: &str) -> String {
    let safe: String = session_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();
    format!("{safe}_{}", chrono::Utc::now().timestamp_millis())
}
