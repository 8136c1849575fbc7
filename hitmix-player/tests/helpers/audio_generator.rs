//! Synthetic audio for tests
//!
//! Buffers are built directly at the mixer rate, so no decoding or
//! resampling is involved unless a test writes a WAV file on purpose.

use hitmix_player::audio::AudioBuffer;
use hound::{WavSpec, WavWriter};
use std::f32::consts::PI;
use std::path::Path;
use std::sync::Arc;

/// Standard test sample rate (44.1 kHz)
pub const TEST_SAMPLE_RATE: u32 = 44100;

/// Frames in `duration_ms` at the test rate
pub fn frame_count(duration_ms: u64) -> usize {
    (TEST_SAMPLE_RATE as u64 * duration_ms / 1000) as usize
}

/// Stereo sine tone at half amplitude
pub fn sine_buffer(frequency: f32, duration_ms: u64) -> Arc<AudioBuffer> {
    let mono: Vec<f32> = (0..frame_count(duration_ms))
        .map(|i| 0.5 * (2.0 * PI * frequency * i as f32 / TEST_SAMPLE_RATE as f32).sin())
        .collect();
    Arc::new(AudioBuffer::from_mono(&mono, TEST_SAMPLE_RATE))
}

/// Buffer holding one constant value on both channels
pub fn constant_buffer(value: f32, duration_ms: u64) -> Arc<AudioBuffer> {
    Arc::new(AudioBuffer::new(
        vec![value; frame_count(duration_ms) * 2],
        TEST_SAMPLE_RATE,
    ))
}

/// Write a 16-bit stereo sine WAV file
pub fn generate_sine_wav<P: AsRef<Path>>(
    path: P,
    frequency: f32,
    duration_ms: u64,
) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels: 2,
        sample_rate: TEST_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;

    for i in 0..frame_count(duration_ms) {
        let t = i as f32 / TEST_SAMPLE_RATE as f32;
        let sample = ((2.0 * PI * frequency * t).sin() * i16::MAX as f32 * 0.5) as i16;
        writer.write_sample(sample)?;
        writer.write_sample(sample)?;
    }

    writer.finalize()
}
