//! Voice processing: capability clients and local audio I/O
//!
//! STT and TTS are thin clients over external capabilities; capture and
//! playback drive the local audio hardware for the rehearsal loop.

pub mod capture;
pub mod playback;
mod stt;
mod tts;

pub use capture::{AudioCapture, SAMPLE_RATE, record_blocking, samples_to_wav};
pub use playback::{play_mp3, play_samples};
pub use stt::{DeepgramTranscriber, SpeechToText, normalize_content_type};
pub use tts::{ElevenLabsSynthesizer, TextToSpeech};
