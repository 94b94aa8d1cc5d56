//! Shared test doubles for exercising the turn pipeline without a network
#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use pitch_gateway::artifacts::ArtifactStore;
use pitch_gateway::generate::{ChatCompletion, ChatOutcome, ReplyGenerator, TokenUsage};
use pitch_gateway::orchestrator::Orchestrator;
use pitch_gateway::persona::VoiceProfile;
use pitch_gateway::session::{SessionStore, Turn};
use pitch_gateway::voice::{SpeechToText, TextToSpeech};
use pitch_gateway::{Error, Result};

/// One scripted transcription outcome
#[derive(Debug, Clone)]
pub enum SttScript {
    /// A successful transcript
    Text(String),
    /// The service heard nothing
    Empty,
    /// Transport/protocol failure
    Fail,
}

/// Scripted speech-to-text double; replays the script, then repeats the
/// last entry forever
pub struct MockStt {
    script: Mutex<VecDeque<SttScript>>,
    last: SttScript,
    pub calls: AtomicUsize,
}

impl MockStt {
    pub fn sequence(script: Vec<SttScript>) -> Arc<Self> {
        let mut script = VecDeque::from(script);
        let last = script.pop_back().expect("script must not be empty");
        Arc::new(Self {
            script: Mutex::new(script),
            last,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn with_transcript(text: &str) -> Arc<Self> {
        Self::sequence(vec![SttScript::Text(text.to_string())])
    }

    pub fn empty() -> Arc<Self> {
        Self::sequence(vec![SttScript::Empty])
    }

    pub fn failing() -> Arc<Self> {
        Self::sequence(vec![SttScript::Fail])
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechToText for MockStt {
    async fn transcribe(&self, _audio: &[u8], _content_type: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.last.clone());
        match next {
            SttScript::Text(text) => Ok(text),
            SttScript::Empty => Ok(String::new()),
            SttScript::Fail => Err(Error::Transcription("simulated STT outage".to_string())),
        }
    }
}

/// One scripted generation outcome
#[derive(Debug, Clone)]
pub enum ChatScript {
    Reply {
        text: String,
        usage: Option<TokenUsage>,
    },
    Fail,
}

/// Scripted chat double recording what it was asked
pub struct MockChat {
    script: Mutex<VecDeque<ChatScript>>,
    last: ChatScript,
    pub calls: AtomicUsize,
    pub seen_messages: Mutex<Vec<Vec<Turn>>>,
}

impl MockChat {
    pub fn sequence(script: Vec<ChatScript>) -> Arc<Self> {
        let mut script = VecDeque::from(script);
        let last = script.pop_back().expect("script must not be empty");
        Arc::new(Self {
            script: Mutex::new(script),
            last,
            calls: AtomicUsize::new(0),
            seen_messages: Mutex::new(Vec::new()),
        })
    }

    pub fn with_reply(text: &str) -> Arc<Self> {
        Self::sequence(vec![ChatScript::Reply {
            text: text.to_string(),
            usage: None,
        }])
    }

    pub fn with_usage(text: &str, total_tokens: u32) -> Arc<Self> {
        Self::sequence(vec![ChatScript::Reply {
            text: text.to_string(),
            usage: Some(TokenUsage {
                prompt_tokens: total_tokens / 2,
                completion_tokens: total_tokens - total_tokens / 2,
                total_tokens,
            }),
        }])
    }

    pub fn failing() -> Arc<Self> {
        Self::sequence(vec![ChatScript::Fail])
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatCompletion for MockChat {
    async fn complete(&self, messages: &[Turn], _max_tokens: u32) -> Result<ChatOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_messages.lock().unwrap().push(messages.to_vec());
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.last.clone());
        match next {
            ChatScript::Reply { text, usage } => Ok(ChatOutcome { text, usage }),
            ChatScript::Fail => Err(Error::Generation("simulated LLM outage".to_string())),
        }
    }
}

/// One scripted synthesis outcome
#[derive(Debug, Clone)]
pub enum TtsScript {
    Audio(Vec<u8>),
    /// Zero-byte artifact from the service
    Silent,
    Fail,
}

/// Scripted text-to-speech double
pub struct MockTts {
    script: Mutex<VecDeque<TtsScript>>,
    last: TtsScript,
    pub calls: AtomicUsize,
}

impl MockTts {
    pub fn sequence(script: Vec<TtsScript>) -> Arc<Self> {
        let mut script = VecDeque::from(script);
        let last = script.pop_back().expect("script must not be empty");
        Arc::new(Self {
            script: Mutex::new(script),
            last,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn with_audio(audio: &[u8]) -> Arc<Self> {
        Self::sequence(vec![TtsScript::Audio(audio.to_vec())])
    }

    pub fn silent() -> Arc<Self> {
        Self::sequence(vec![TtsScript::Silent])
    }

    pub fn failing() -> Arc<Self> {
        Self::sequence(vec![TtsScript::Fail])
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextToSpeech for MockTts {
    async fn synthesize(&self, _text: &str, _voice: &VoiceProfile) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.last.clone());
        match next {
            TtsScript::Audio(audio) => Ok(audio),
            TtsScript::Silent => Ok(Vec::new()),
            TtsScript::Fail => Err(Error::Synthesis("simulated TTS outage".to_string())),
        }
    }
}

/// Assemble an orchestrator over mock capabilities and a temp artifact dir
pub fn orchestrator_with(
    stt: Arc<MockStt>,
    chat: Arc<MockChat>,
    tts: Arc<MockTts>,
    artifact_dir: &Path,
) -> (Orchestrator, Arc<SessionStore>) {
    let sessions = Arc::new(SessionStore::new());
    let generator = ReplyGenerator::new(chat, 256, 12);
    let artifacts = ArtifactStore::open(artifact_dir).expect("artifact dir");
    let orchestrator = Orchestrator::new(
        Arc::clone(&sessions),
        stt,
        generator,
        tts,
        artifacts,
    );
    (orchestrator, sessions)
}
