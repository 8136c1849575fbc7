//! Millisecond and frame conversion utilities
//!
//! Chart offsets and clock positions are `f64` milliseconds; mixing works in
//! stereo frames at the mixer sample rate.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Convert a millisecond length to a frame count (rounded down, negative → 0)
pub fn ms_to_frames(ms: f64, sample_rate: u32) -> usize {
    if !ms.is_finite() || ms <= 0.0 {
        return 0;
    }
    (ms * sample_rate as f64 / 1000.0) as usize
}

/// Convert a frame count to milliseconds
pub fn frames_to_ms(frames: usize, sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        return 0.0;
    }
    frames as f64 * 1000.0 / sample_rate as f64
}

/// Convert fractional milliseconds to a `Duration` (negative / NaN → zero)
pub fn millis_to_duration(ms: f64) -> Duration {
    if !ms.is_finite() || ms <= 0.0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(ms / 1000.0)
}

/// Convert a `Duration` to fractional milliseconds
pub fn duration_to_millis(duration: Duration) -> f64 {
    duration.as_nanos() as f64 / 1_000_000.0
}
