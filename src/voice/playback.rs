//! Speaker playback for synthesized replies

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleRate;

use crate::{Error, Result};

/// Sample rate for playback (matches common TTS output)
const PLAYBACK_SAMPLE_RATE: u32 = 24000;

/// Play MP3 audio through the default output device.
///
/// Blocking; callers on the async runtime should wrap this in
/// `spawn_blocking`.
///
/// # Errors
///
/// Returns error if decoding fails or no output device is available
pub fn play_mp3(mp3_data: &[u8]) -> Result<()> {
    let samples = decode_mp3(mp3_data)?;
    play_samples(&samples)
}

/// Play f32 samples through the default output device. Blocking.
///
/// # Errors
///
/// Returns error if no suitable output device is available
pub fn play_samples(samples: &[f32]) -> Result<()> {
    if samples.is_empty() {
        return Ok(());
    }

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

    let supported_config = device
        .supported_output_configs()
        .map_err(|e| Error::Audio(e.to_string()))?
        .find(|c| {
            c.channels() <= 2
                && c.min_sample_rate() <= SampleRate(PLAYBACK_SAMPLE_RATE)
                && c.max_sample_rate() >= SampleRate(PLAYBACK_SAMPLE_RATE)
        })
        .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;

    let config = supported_config
        .with_sample_rate(SampleRate(PLAYBACK_SAMPLE_RATE))
        .config();
    let channels = config.channels as usize;

    let samples = Arc::new(samples.to_vec());
    let position = Arc::new(AtomicUsize::new(0));

    let stream_samples = Arc::clone(&samples);
    let stream_position = Arc::clone(&position);

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                for frame in data.chunks_mut(channels) {
                    let pos = stream_position.load(Ordering::Relaxed);
                    let sample = stream_samples.get(pos).copied().unwrap_or(0.0);
                    for out in frame.iter_mut() {
                        *out = sample;
                    }
                    if pos < stream_samples.len() {
                        stream_position.store(pos + 1, Ordering::Relaxed);
                    }
                }
            },
            |err| {
                tracing::error!(error = %err, "audio playback error");
            },
            None,
        )
        .map_err(|e| Error::Audio(e.to_string()))?;

    stream.play().map_err(|e| Error::Audio(e.to_string()))?;

    // Wait until the cursor reaches the end, bounded by the nominal
    // duration plus a small pad.
    let duration_ms = (samples.len() as u64 * 1000) / u64::from(PLAYBACK_SAMPLE_RATE);
    let deadline = std::time::Instant::now() + std::time::Duration::from_millis(duration_ms + 500);

    while position.load(Ordering::Relaxed) < samples.len() {
        if std::time::Instant::now() > deadline {
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(50));
    }
    std::thread::sleep(std::time::Duration::from_millis(100));

    drop(stream);
    tracing::debug!(samples = samples.len(), "playback complete");
    Ok(())
}

/// Decode MP3 bytes to mono f32 samples
fn decode_mp3(mp3_data: &[u8]) -> Result<Vec<f32>> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if frame.channels == 2 {
                    // average stereo pairs down to mono
                    samples.extend(frame.data.chunks(2).map(|chunk| {
                        let left = f32::from(chunk[0]) / 32768.0;
                        let right = f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                        f32::midpoint(left, right)
                    }));
                } else {
                    samples.extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Audio(format!("MP3 decode error: {e}"))),
        }
    }

    Ok(samples)
}
