//! # hitmix Common Library
//!
//! Shared code for the hitmix workspace:
//! - Error type used by configuration and utility code
//! - Playback status and notification event types
//! - Fade curve definitions for release envelopes
//! - Millisecond / frame conversion helpers
//! - Configuration file resolution

pub mod config;
pub mod error;
pub mod events;
pub mod fade_curves;
pub mod time;

pub use error::{Error, Result};
pub use events::{HitmixEvent, PlaybackStatus};
pub use fade_curves::FadeCurve;
