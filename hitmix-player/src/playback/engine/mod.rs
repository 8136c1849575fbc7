//! Playback engine
//!
//! **Module Structure:**
//! - `core.rs`: struct, construction, timeline/queue management, observables, disposal
//! - `playback.rs`: play / pause / stop / restart and the background loop
//! - `seek.rs`: skip_to, sync and clock/mix adjustments

mod core;
mod playback;
mod seek;

pub use core::{ChannelBus, PlaybackEngine};
