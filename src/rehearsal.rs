//! Unattended rehearsal loop: record → transcribe → generate → synthesize → play
//!
//! Single-threaded and strictly turn-by-turn. Each round records a fixed
//! window from the microphone after a countdown, runs the same pipeline
//! the HTTP surface uses, and speaks the reply. A cumulative token budget
//! bounds the run: the loop stops *before* a round when the budget is
//! already spent, and *after* a round whose accounting crosses the ceiling.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::budget::TokenBudget;
use crate::generate::ReplyGenerator;
use crate::persona::CaseStudy;
use crate::session::Session;
use crate::voice::{self, SAMPLE_RATE, SpeechToText, TextToSpeech, samples_to_wav};
use crate::{Error, Result};

/// Spoken commands that end the session
const QUIT_WORDS: [&str; 3] = ["quit", "exit", "stop"];

/// Source of recorded speech for one round
#[async_trait]
pub trait AudioSource: Send {
    /// Record mono f32 samples at [`SAMPLE_RATE`] for `duration`
    async fn record(&mut self, duration: Duration) -> Result<Vec<f32>>;
}

/// Sink for the persona's spoken replies
#[async_trait]
pub trait AudioSink: Send {
    /// Play MP3 audio to completion
    async fn play(&mut self, mp3: &[u8]) -> Result<()>;
}

/// Default microphone as an [`AudioSource`]
#[derive(Debug, Default)]
pub struct MicSource;

#[async_trait]
impl AudioSource for MicSource {
    async fn record(&mut self, duration: Duration) -> Result<Vec<f32>> {
        // cpal streams are created and dropped on the blocking thread
        tokio::task::spawn_blocking(move || voice::record_blocking(duration))
            .await
            .map_err(|e| Error::Audio(format!("capture task failed: {e}")))?
    }
}

/// Default speakers as an [`AudioSink`]
#[derive(Debug, Default)]
pub struct SpeakerSink;

#[async_trait]
impl AudioSink for SpeakerSink {
    async fn play(&mut self, mp3: &[u8]) -> Result<()> {
        let mp3 = mp3.to_vec();
        tokio::task::spawn_blocking(move || voice::play_mp3(&mp3))
            .await
            .map_err(|e| Error::Audio(format!("playback task failed: {e}")))?
    }
}

/// Why the loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Budget already spent before a round began; nothing was attempted
    BudgetExhaustedBeforeTurn,
    /// The final round's accounting crossed the ceiling
    BudgetExhaustedAfterTurn,
    /// The speaker asked to stop
    QuitRequested,
    /// Optional round cap reached
    RoundLimit,
}

/// Loop tuning
#[derive(Debug, Clone)]
pub struct RehearsalSettings {
    /// Persona to rehearse against
    pub case_study: CaseStudy,
    /// Speaking time per round
    pub record_seconds: u64,
    /// Countdown before each recording
    pub countdown_seconds: u64,
    /// Optional cap on rounds
    pub max_rounds: Option<u32>,
}

/// Drives unattended rounds against the turn pipeline
pub struct RehearsalLoop {
    stt: Arc<dyn SpeechToText>,
    generator: ReplyGenerator,
    tts: Arc<dyn TextToSpeech>,
    source: Box<dyn AudioSource>,
    sink: Box<dyn AudioSink>,
    settings: RehearsalSettings,
}

impl RehearsalLoop {
    /// Assemble a loop over the given capabilities and audio endpoints
    pub fn new(
        stt: Arc<dyn SpeechToText>,
        generator: ReplyGenerator,
        tts: Arc<dyn TextToSpeech>,
        source: Box<dyn AudioSource>,
        sink: Box<dyn AudioSink>,
        settings: RehearsalSettings,
    ) -> Self {
        Self {
            stt,
            generator,
            tts,
            source,
            sink,
            settings,
        }
    }

    /// Run rounds until the budget, a quit command, or the round cap ends
    /// the session. The budget survives the loop so the caller can report
    /// final spend.
    ///
    /// # Errors
    ///
    /// Returns the first non-transcription stage failure; empty or failed
    /// transcriptions skip the round instead
    pub async fn run(&mut self, budget: &mut TokenBudget) -> Result<StopReason> {
        let persona = self.settings.case_study.persona();
        let mut session = Session::new(self.settings.case_study);

        println!(
            "=== Rehearsing against {} (budget ~{} tokens) ===",
            persona.name,
            budget.ceiling()
        );
        println!("Say \"quit\", \"exit\" or \"stop\" to end the session.\n");

        let mut round: u32 = 1;
        loop {
            if budget.is_exhausted() {
                println!("\n[!] Token budget reached. Ending rehearsal.");
                return Ok(StopReason::BudgetExhaustedBeforeTurn);
            }
            if let Some(cap) = self.settings.max_rounds {
                if round > cap {
                    return Ok(StopReason::RoundLimit);
                }
            }

            println!("=== Round {round} ===");
            self.countdown().await;

            println!("Recording for {} seconds. Speak!", self.settings.record_seconds);
            let samples = self
                .source
                .record(Duration::from_secs(self.settings.record_seconds))
                .await?;
            let wav = samples_to_wav(&samples, SAMPLE_RATE)?;

            let transcript = match self.stt.transcribe(&wav, "audio/wav").await {
                Ok(text) => text,
                Err(Error::Transcription(reason)) => {
                    tracing::warn!(%reason, "transcription failed");
                    String::new()
                }
                Err(e) => return Err(e),
            };
            if transcript.is_empty() {
                println!("No speech detected; skipping this round.\n");
                round += 1;
                continue;
            }

            println!("\n[You]: {transcript}\n");

            if is_quit_command(&transcript) {
                println!("Heard a quit command. Ending rehearsal.");
                return Ok(StopReason::QuitRequested);
            }

            let (reply, tokens) = self.generator.generate(&mut session, &transcript).await?;
            budget.charge(tokens);
            tracing::debug!(tokens, spent = budget.spent(), "round accounted");

            println!("[{}]: {reply}\n", persona.name);

            let audio = self.tts.synthesize(&reply, &persona.voice).await?;
            if let Err(e) = self.sink.play(&audio).await {
                // A silent round is annoying but not fatal; the reply text
                // is already on screen.
                tracing::warn!(error = %e, "playback failed");
            }

            if budget.is_exhausted() {
                println!("\n[!] Token budget reached after this reply. Ending rehearsal.");
                return Ok(StopReason::BudgetExhaustedAfterTurn);
            }

            round += 1;
        }
    }

    async fn countdown(&self) {
        if self.settings.countdown_seconds == 0 {
            return;
        }
        println!("Recording starts in:");
        for i in (1..=self.settings.countdown_seconds).rev() {
            println!("  {i}...");
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }
}

/// Whether the transcript contains a spoken end-of-session command
#[must_use]
pub fn is_quit_command(transcript: &str) -> bool {
    let lower = transcript.to_lowercase();
    QUIT_WORDS.iter().any(|word| lower.contains(word))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quit_words_are_detected_anywhere() {
        assert!(is_quit_command("quit"));
        assert!(is_quit_command("I think we should STOP here."));
        assert!(is_quit_command("please exit now"));
        assert!(!is_quit_command("tell me about your funding ask"));
    }
}
