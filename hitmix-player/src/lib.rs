//! # hitmix Player Library (hitmix-player)
//!
//! Multi-event sound channel: schedules hit sounds and sustained slider
//! sounds from a time-ordered timeline against a variable-rate clock and
//! feeds them into a mixing graph.
//!
//! **Architecture:**
//! - `playback::clock`: variable-rate stopwatch with tempo correction
//! - `playback::timeline`: immutable timeline and seekable dispatch queue
//! - `playback::engine`: lifecycle state machine and background playback loop
//! - `playback::orchestrator`: applies dispatched events to the mixing bus
//! - `playback::mixer` / `playback::nodes`: software mixing graph
//! - `audio`: sample decoding, resampling and the sound cache

pub mod audio;
pub mod config;
pub mod error;
pub mod playback;
pub mod state;

pub use error::{Error, Result};
pub use playback::PlaybackEngine;
pub use state::SharedState;
