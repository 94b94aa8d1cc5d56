use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pitch_gateway::api::{ApiServer, ApiState};
use pitch_gateway::artifacts::ArtifactStore;
use pitch_gateway::generate::{OpenAiChat, ReplyGenerator};
use pitch_gateway::orchestrator::Orchestrator;
use pitch_gateway::rehearsal::{MicSource, RehearsalLoop, RehearsalSettings, SpeakerSink};
use pitch_gateway::session::SessionStore;
use pitch_gateway::voice::{
    AudioCapture, DeepgramTranscriber, ElevenLabsSynthesizer, play_samples,
};
use pitch_gateway::{CaseStudy, Config, TokenBudget};

/// Pitch - voice rehearsal gateway for fundraising practice
#[derive(Parser)]
#[command(name = "pitch", version, about)]
struct Cli {
    /// Port for the HTTP API server
    #[arg(long, env = "PITCH_PORT", default_value = "8080")]
    port: u16,

    /// Directory of static frontend files to serve
    #[arg(long, env = "PITCH_STATIC_DIR")]
    static_dir: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the unattended microphone rehearsal loop
    Rehearse {
        /// Case study to rehearse against
        #[arg(short, long, env = "PITCH_CASE_STUDY", default_value = "template1")]
        case_study: String,

        /// Optional cap on rehearsal rounds
        #[arg(long)]
        rounds: Option<u32>,
    },
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Synthesize a line with a case study's voice and play it
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the rehearsal voice.")]
        text: String,

        /// Case study whose voice to use
        #[arg(short, long, default_value = "template1")]
        case_study: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info,pitch_gateway=info",
        1 => "info,pitch_gateway=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(cmd) = cli.command {
        return match cmd {
            Command::Rehearse { case_study, rounds } => rehearse(&case_study, rounds).await,
            Command::TestMic { duration } => test_mic(duration).await,
            Command::TestSpeaker => test_speaker().await,
            Command::TestTts { text, case_study } => test_tts(&text, &case_study).await,
        };
    }

    serve(cli.port, cli.static_dir).await
}

/// Run the HTTP API server
async fn serve(port: u16, static_dir: Option<PathBuf>) -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing::info!(
        port,
        chat_model = %config.chat.model,
        stt_model = %config.voice.stt_model,
        tts_model = %config.voice.tts_model,
        "starting pitch gateway"
    );

    let state = build_state(&config)?;
    let server = ApiServer::new(Arc::new(state), port, static_dir);
    server.run().await?;

    Ok(())
}

/// Wire the capability clients into shared API state
fn build_state(config: &Config) -> anyhow::Result<ApiState> {
    let timeout = config.request_timeout;

    let stt = Arc::new(DeepgramTranscriber::new(
        config.api_keys.deepgram.clone(),
        config.voice.stt_model.clone(),
        timeout,
    )?);
    let chat = Arc::new(OpenAiChat::new(
        config.api_keys.openai.clone(),
        config.chat.model.clone(),
        timeout,
    )?);
    let tts = Arc::new(ElevenLabsSynthesizer::new(
        config.api_keys.elevenlabs.clone(),
        config.voice.tts_model.clone(),
        timeout,
    )?);

    let generator = ReplyGenerator::new(
        chat,
        config.chat.max_reply_tokens,
        config.chat.max_history_messages,
    );
    let sessions = Arc::new(SessionStore::new());
    let artifacts = ArtifactStore::open(&config.audio_out_dir)?;
    let orchestrator = Orchestrator::new(
        Arc::clone(&sessions),
        stt,
        generator,
        tts,
        artifacts.clone(),
    );

    Ok(ApiState {
        orchestrator,
        sessions,
        artifacts,
        stt_model: config.voice.stt_model.clone(),
        tts_model: config.voice.tts_model.clone(),
        chat_model: config.chat.model.clone(),
    })
}

/// Run the unattended microphone rehearsal loop
async fn rehearse(case_study: &str, rounds: Option<u32>) -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let timeout = config.request_timeout;

    let stt = Arc::new(DeepgramTranscriber::new(
        config.api_keys.deepgram.clone(),
        config.voice.stt_model.clone(),
        timeout,
    )?);
    let chat = Arc::new(OpenAiChat::new(
        config.api_keys.openai.clone(),
        config.chat.model.clone(),
        timeout,
    )?);
    let tts = Arc::new(ElevenLabsSynthesizer::new(
        config.api_keys.elevenlabs.clone(),
        config.voice.tts_model.clone(),
        timeout,
    )?);
    let generator = ReplyGenerator::new(
        chat,
        config.chat.max_reply_tokens,
        config.chat.max_history_messages,
    );

    let settings = RehearsalSettings {
        case_study: CaseStudy::resolve(case_study),
        record_seconds: config.voice.record_seconds,
        countdown_seconds: config.voice.countdown_seconds,
        max_rounds: rounds,
    };

    let mut budget = TokenBudget::new(config.chat.conversation_token_limit);
    let mut rehearsal = RehearsalLoop::new(
        stt,
        generator,
        tts,
        Box::new(MicSource),
        Box::new(SpeakerSink),
        settings,
    );

    let reason = rehearsal.run(&mut budget).await?;
    println!(
        "\nSession over ({reason:?}); ~{} of {} budget tokens used.",
        budget.spent(),
        budget.ceiling()
    );

    Ok(())
}

/// Test microphone input with a level meter
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = AudioCapture::new()?;
    capture.start()?;

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.peek_buffer();
        let energy = calculate_rms(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "█".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!("[{:2}s] RMS: {energy:.4} | Peak: {peak:.4} | [{meter}]", i + 1);

        capture.clear_buffer();
    }

    capture.stop();

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working.");
    println!("If RMS stayed near 0, check your default input device and levels.");

    Ok(())
}

/// Calculate RMS energy
#[allow(clippy::cast_precision_loss)]
fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Test speaker output with a sine tone
async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let sample_rate = 24000_u32;
    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..sample_rate * 2)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.3
        })
        .collect();

    tokio::task::spawn_blocking(move || play_samples(&samples)).await??;

    println!("\n---");
    println!("If you heard the tone, your speakers are working.");

    Ok(())
}

/// Synthesize a line and play it
async fn test_tts(text: &str, case_study: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let config = Config::from_env()?;
    let tts = ElevenLabsSynthesizer::new(
        config.api_keys.elevenlabs.clone(),
        config.voice.tts_model.clone(),
        config.request_timeout,
    )?;

    let persona = CaseStudy::resolve(case_study).persona();
    println!("Synthesizing with {}'s voice...", persona.name);

    use pitch_gateway::voice::TextToSpeech as _;
    let mp3 = tts.synthesize(text, &persona.voice).await?;
    println!("Got {} bytes of audio data", mp3.len());

    println!("Playing audio...");
    tokio::task::spawn_blocking(move || pitch_gateway::voice::play_mp3(&mp3)).await??;

    println!("\n---");
    println!("If you heard the speech, TTS is working.");

    Ok(())
}
