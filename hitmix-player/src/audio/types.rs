//! Core audio data types
//!
//! Decoded sounds are held fully in RAM as interleaved stereo `f32` at the
//! mixer sample rate, shared between the cache and every node playing them.

/// Decoded, resampled audio ready for mixing
///
/// **Format:**
/// - Samples are f32 (floating point -1.0 to 1.0)
/// - Stereo interleaved: [L, R, L, R, ...]
/// - Sample rate equals the mixer rate (resampled at load time)
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// PCM audio samples (interleaved stereo)
    samples: Vec<f32>,

    /// Sample rate of `samples`
    sample_rate: u32,
}

impl AudioBuffer {
    /// Wrap interleaved stereo samples
    ///
    /// A trailing half frame (odd sample count) is discarded.
    pub fn new(mut samples: Vec<f32>, sample_rate: u32) -> Self {
        if samples.len() % 2 != 0 {
            samples.pop();
        }
        Self {
            samples,
            sample_rate,
        }
    }

    /// Build a stereo buffer from mono samples
    pub fn from_mono(mono: &[f32], sample_rate: u32) -> Self {
        let samples = mono.iter().flat_map(|&s| [s, s]).collect();
        Self::new(samples, sample_rate)
    }

    /// Silent buffer of `frames` frames
    pub fn silence(frames: usize, sample_rate: u32) -> Self {
        Self::new(vec![0.0; frames * 2], sample_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of stereo frames
    pub fn frames(&self) -> usize {
        self.samples.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Natural length in milliseconds
    pub fn duration_ms(&self) -> f64 {
        hitmix_common::time::frames_to_ms(self.frames(), self.sample_rate)
    }

    /// Stereo frame at `index`
    pub fn frame(&self, index: usize) -> Option<(f32, f32)> {
        let i = index * 2;
        match (self.samples.get(i), self.samples.get(i + 1)) {
            (Some(&l), Some(&r)) => Some((l, r)),
            _ => None,
        }
    }
}
