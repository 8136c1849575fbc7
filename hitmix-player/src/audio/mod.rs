//! Audio content: decoded buffers, decoding, resampling and the sound cache
//!
//! Nothing here runs on the playback loop's hot path except
//! `SoundResolver::cached`, which is a map lookup.

pub mod cache;
pub mod decoder;
pub mod resampler;
pub mod types;

pub use cache::{prewarm, SoundCache, SoundResolver};
pub use decoder::SimpleDecoder;
pub use resampler::Resampler;
pub use types::AudioBuffer;
